//! Session events and actions.

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use parley_proto::{Envelope, Message, Roster};

/// Identifies one channel instance.
///
/// Every connection attempt gets a fresh id. Events tagged with an id other
/// than the session's active channel are stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Events the driver feeds into the session.
///
/// Every event carries the current instant so the session can fire timers
/// that fell due before the event itself is applied.
#[derive(Debug, Clone)]
pub enum SessionEvent<I> {
    /// User chose a display name and wants to join.
    StartSession {
        /// Requested display name (trimmed by the session)
        display_name: String,
        /// Current time
        now: I,
    },

    /// User closed the client.
    EndSession {
        /// Current time
        now: I,
    },

    /// Channel finished opening.
    ChannelOpened {
        /// Channel that opened
        channel: ChannelId,
        /// Current time
        now: I,
    },

    /// Raw envelope text arrived on a channel.
    ChannelMessage {
        /// Channel it arrived on
        channel: ChannelId,
        /// Undecoded wire text
        raw: String,
        /// Current time
        now: I,
    },

    /// Channel closed, normally or not.
    ChannelClosed {
        /// Channel that closed
        channel: ChannelId,
        /// Current time
        now: I,
    },

    /// Channel reported a transport error.
    ChannelError {
        /// Channel that failed
        channel: ChannelId,
        /// Transport error description
        reason: String,
        /// Current time
        now: I,
    },

    /// Local keystroke in the message input.
    Keystroke {
        /// Current time
        now: I,
    },

    /// User submitted a chat message.
    SendMessage {
        /// Message text, trimmed before sending
        body: String,
        /// Wall-clock stamp for the outbound message
        sent_at: DateTime<Utc>,
        /// Current time
        now: I,
    },

    /// Timer tick.
    Tick {
        /// Current time
        now: I,
    },
}

impl<I: Copy> SessionEvent<I> {
    /// Instant carried by this event.
    pub fn now(&self) -> I {
        match self {
            Self::StartSession { now, .. }
            | Self::EndSession { now }
            | Self::ChannelOpened { now, .. }
            | Self::ChannelMessage { now, .. }
            | Self::ChannelClosed { now, .. }
            | Self::ChannelError { now, .. }
            | Self::Keystroke { now }
            | Self::SendMessage { now, .. }
            | Self::Tick { now } => *now,
        }
    }
}

/// Actions the session produces for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Create and open a new channel with this id.
    OpenChannel {
        /// Id the driver must tag the channel's events with
        channel: ChannelId,
    },

    /// Close and discard this channel.
    CloseChannel {
        /// Channel to close
        channel: ChannelId,
    },

    /// Send an envelope on the active channel.
    Send {
        /// Target channel
        channel: ChannelId,
        /// Envelope to encode and send
        envelope: Envelope,
    },

    /// Tell the presentation layer something changed.
    Notify(Notification),
}

/// Presentation-layer notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Connection indicator should show connected / not connected.
    ConnectionStatusChanged {
        /// True only while the session is `Connected`
        connected: bool,
    },

    /// A new message arrived.
    MessageReceived(Message),

    /// Replace the message log wholesale. Empty means show the placeholder.
    HistoryLoaded(Vec<Message>),

    /// Roster changed.
    RosterChanged {
        /// Full roster after the change
        roster: Roster,
        /// Number of participants
        total: usize,
    },

    /// Set of typing participants changed.
    TypingSetChanged(BTreeSet<String>),

    /// A participant announced themselves.
    ParticipantJoined(String),

    /// A participant left.
    ParticipantLeft(String),

    /// Reconnect attempts exhausted; the session is closed for good.
    SessionFailed {
        /// Last transport failure
        reason: String,
    },
}
