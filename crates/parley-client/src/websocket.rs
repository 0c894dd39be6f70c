//! WebSocket transport.
//!
//! Each channel is one WebSocket connection carrying JSON envelopes as text
//! frames. The I/O task connects, reports open, then bridges between the
//! outgoing queue and the socket until either side closes. A local close
//! sends a Close frame and ends the task silently.

use futures::{SinkExt, StreamExt};
use parley_core::ChannelId;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;

use crate::{
    channel::{Channel, ChannelEvent, ChannelEventKind, Connector, EventSender},
    error::TransportError,
};

/// Connector for a WebSocket chat server.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Connect to `url` (`ws://` or `wss://`).
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Server URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WsConnector {
    fn connect(&mut self, id: ChannelId, events: EventSender) -> Channel {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_channel(self.url.clone(), id, outgoing_rx, events));
        Channel::new(id, outgoing_tx, handle.abort_handle())
    }
}

/// How a bridged connection ended.
enum Ending {
    /// Our side closed the channel; nothing to report.
    Local,
    /// Server closed the socket.
    Remote,
}

/// Run one connection and report how it ended.
async fn run_channel(
    url: String,
    id: ChannelId,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    events: EventSender,
) {
    let kind = match bridge(&url, id, &mut outgoing, &events).await {
        Ok(Ending::Local) => {
            tracing::debug!(channel = %id, "websocket closed locally");
            return;
        },
        Ok(Ending::Remote) => ChannelEventKind::Closed,
        Err(e) => {
            tracing::warn!(channel = %id, error = %e, "websocket failed");
            ChannelEventKind::Error(e.to_string())
        },
    };
    let _ = events.send(ChannelEvent::new(id, kind));
}

async fn bridge(
    url: &str,
    id: ChannelId,
    outgoing: &mut mpsc::UnboundedReceiver<String>,
    events: &EventSender,
) -> Result<Ending, TransportError> {
    let (stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    tracing::debug!(channel = %id, url, "websocket connected");
    if events.send(ChannelEvent::new(id, ChannelEventKind::Open)).is_err() {
        return Ok(Ending::Local);
    }

    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            frame = outgoing.recv() => match frame {
                Some(text) => {
                    write
                        .send(tungstenite::Message::Text(text.into()))
                        .await
                        .map_err(|e| TransportError::Stream(e.to_string()))?;
                },
                None => {
                    if let Err(e) = write.send(tungstenite::Message::Close(None)).await {
                        tracing::debug!(channel = %id, error = %e, "close frame not sent");
                    }
                    return Ok(Ending::Local);
                },
            },
            frame = read.next() => match frame {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    let event = ChannelEvent::new(id, ChannelEventKind::Message(text.to_string()));
                    if events.send(event).is_err() {
                        return Ok(Ending::Local);
                    }
                },
                Some(Ok(tungstenite::Message::Close(_))) | None => return Ok(Ending::Remote),
                // Ping/pong are answered by tungstenite; binary is not part of the protocol
                Some(Ok(_)) => {},
                Some(Err(e)) => return Err(TransportError::Stream(e.to_string())),
            },
        }
    }
}
