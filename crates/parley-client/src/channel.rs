//! Bidirectional text channel to a chat server.
//!
//! A [`Connector`] creates one [`Channel`] per connection attempt. Each
//! channel runs its I/O on a spawned task and reports everything it sees as
//! [`ChannelEvent`]s tagged with the id the session assigned.
//!
//! Closing a channel drops its outgoing queue, which tells the I/O task to
//! shut the connection down cleanly and exit without reporting. A task still
//! running [`CLOSE_GRACE`] later is aborted.

use std::time::Duration;

use parley_core::ChannelId;
use tokio::{sync::mpsc, task::AbortHandle};

use crate::error::TransportError;

/// What happened on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEventKind {
    /// Channel finished opening.
    Open,
    /// Text frame arrived.
    Message(String),
    /// Peer closed the channel.
    Closed,
    /// Transport failed. The channel is dead.
    Error(String),
}

/// Event reported by a channel's I/O task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEvent {
    /// Channel that produced the event
    pub channel: ChannelId,
    /// What happened
    pub kind: ChannelEventKind,
}

impl ChannelEvent {
    /// Create an event.
    pub fn new(channel: ChannelId, kind: ChannelEventKind) -> Self {
        Self { channel, kind }
    }
}

/// How long a closed channel's I/O task may take to shut down.
pub const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Sender half used by I/O tasks to report events.
pub type EventSender = mpsc::UnboundedSender<ChannelEvent>;

/// Handle to one open (or opening) channel.
///
/// Frames are queued to the I/O task. Dropping the handle closes the
/// channel.
#[derive(Debug)]
pub struct Channel {
    id: ChannelId,
    /// `None` once closed
    outgoing: Option<mpsc::UnboundedSender<String>>,
    abort_handle: Option<AbortHandle>,
}

impl Channel {
    /// Wrap an I/O task.
    ///
    /// The task must treat a closed `outgoing` queue as a local close.
    pub fn new(
        id: ChannelId,
        outgoing: mpsc::UnboundedSender<String>,
        abort_handle: AbortHandle,
    ) -> Self {
        Self { id, outgoing: Some(outgoing), abort_handle: Some(abort_handle) }
    }

    /// Id the session assigned to this channel.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Queue a text frame.
    pub fn send(&self, text: String) -> Result<(), TransportError> {
        let outgoing = self.outgoing.as_ref().ok_or(TransportError::Closed)?;
        outgoing.send(text).map_err(|_| TransportError::Closed)
    }

    /// Close the channel. Idempotent.
    ///
    /// The I/O task gets [`CLOSE_GRACE`] to say goodbye to the peer before it
    /// is aborted. Outside a tokio runtime it is aborted at once.
    pub fn close(&mut self) {
        self.outgoing = None;
        let Some(abort_handle) = self.abort_handle.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(CLOSE_GRACE).await;
                    abort_handle.abort();
                });
            },
            Err(_) => abort_handle.abort(),
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Creates channels.
///
/// `connect` must not block: it spawns the I/O task and returns at once. The
/// task reports [`ChannelEventKind::Open`] when ready, or an error.
pub trait Connector: Send {
    /// Start connecting a channel tagged with `id`.
    fn connect(&mut self, id: ChannelId, events: EventSender) -> Channel;
}
