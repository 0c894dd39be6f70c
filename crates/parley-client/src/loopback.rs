//! In-process demo server.
//!
//! Lets the client run with no network at all. Each channel behaves like a
//! connection to a single-room server that only this client is talking to:
//!
//! - opens 100ms after `connect`
//! - processes each outbound frame 150ms after it was sent
//! - on `join`: assigns a random color, replies with a welcome message from
//!   `System`, then the full `user_list` (+100ms), then a `join` broadcast
//!   (+200ms)
//! - echoes `message` (+100ms), `typing` and `stop_typing` (+50ms)
//!
//! Closing the channel cancels every reply still in flight.
//!
//! The roster outlives individual channels, so a reconnecting client finds
//! itself still listed.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use parley_core::ChannelId;
use parley_proto::{DecodeMode, Envelope, Message, Roster, SYSTEM_SENDER};
use tokio::{sync::mpsc, task::JoinSet};

use crate::channel::{Channel, ChannelEvent, ChannelEventKind, Connector, EventSender};

/// Delay before a new channel reports open.
pub const OPEN_DELAY: Duration = Duration::from_millis(100);

/// Delay before the server looks at an outbound frame.
pub const PROCESS_DELAY: Duration = Duration::from_millis(150);

/// Connector for the in-process demo server.
#[derive(Debug, Clone)]
pub struct LoopbackConnector {
    users: Arc<Mutex<Roster>>,
    palette_size: u32,
}

impl Default for LoopbackConnector {
    fn default() -> Self {
        Self::new(parley_core::presence::DEFAULT_PALETTE_SIZE)
    }
}

impl LoopbackConnector {
    /// Create a server that picks colors from `0..palette_size`.
    pub fn new(palette_size: u32) -> Self {
        Self { users: Arc::new(Mutex::new(Roster::new())), palette_size: palette_size.max(1) }
    }

    /// Participants the server currently knows.
    pub fn users(&self) -> Roster {
        self.users.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Connector for LoopbackConnector {
    fn connect(&mut self, id: ChannelId, events: EventSender) -> Channel {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let handle =
            tokio::spawn(run_loopback(id, outgoing_rx, events, self.users.clone(), self.palette_size));
        Channel::new(id, outgoing_tx, handle.abort_handle())
    }
}

async fn run_loopback(
    id: ChannelId,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    events: EventSender,
    users: Arc<Mutex<Roster>>,
    palette_size: u32,
) {
    tokio::select! {
        () = tokio::time::sleep(OPEN_DELAY) => {},
        None = outgoing.recv() => return,
    }
    if events.send(ChannelEvent::new(id, ChannelEventKind::Open)).is_err() {
        return;
    }

    // Replies in flight. Dropped (and so cancelled) with this task.
    let mut replies = JoinSet::new();

    loop {
        tokio::select! {
            frame = outgoing.recv() => {
                // Closed locally: pending replies are cancelled with the set
                let Some(raw) = frame else { break };

                let color = random_color(palette_size);
                let responses = {
                    let mut users = users.lock().unwrap_or_else(PoisonError::into_inner);
                    respond(&raw, &mut users, color, Utc::now())
                };

                for (delay, text) in responses {
                    let events = events.clone();
                    replies.spawn(async move {
                        tokio::time::sleep(PROCESS_DELAY + delay).await;
                        let _ = events.send(ChannelEvent::new(id, ChannelEventKind::Message(text)));
                    });
                }
            },
            Some(_) = replies.join_next() => {},
        }
    }

    tracing::debug!(channel = %id, "loopback channel finished");
}

fn random_color(palette_size: u32) -> u32 {
    getrandom::u32().unwrap_or(0) % palette_size
}

/// Server reaction to one client frame: `(delay after processing, frame)`.
fn respond(
    raw: &str,
    users: &mut Roster,
    color: u32,
    now: DateTime<Utc>,
) -> Vec<(Duration, String)> {
    let envelope = match Envelope::decode(raw, DecodeMode::Permissive) {
        Ok(Some(envelope)) => envelope,
        Ok(None) => return vec![],
        Err(e) => {
            tracing::debug!(error = %e, "loopback ignoring undecodable frame");
            return vec![];
        },
    };

    match envelope {
        Envelope::Join { user } => {
            users.insert(user.clone(), color);

            let welcome = Message::new(SYSTEM_SENDER, format!("Welcome to the chat, {user}!"), now);
            vec![
                (Duration::ZERO, Envelope::Message(welcome).to_json()),
                (Duration::from_millis(100), Envelope::UserList { users: users.clone() }.to_json()),
                (Duration::from_millis(200), Envelope::Join { user }.to_json()),
            ]
        },
        Envelope::Message(_) => vec![(Duration::from_millis(100), raw.to_owned())],
        Envelope::Typing { .. } | Envelope::StopTyping { .. } => {
            vec![(Duration::from_millis(50), raw.to_owned())]
        },
        Envelope::Leave { .. } | Envelope::UserList { .. } | Envelope::History { .. } => vec![],
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Envelope {
        Envelope::decode(text, DecodeMode::Strict).unwrap().unwrap()
    }

    #[test]
    fn join_gets_welcome_roster_and_broadcast() {
        let mut users = Roster::new();
        let replies = respond(r#"{"type":"join","user":"Alice"}"#, &mut users, 5, Utc::now());

        assert_eq!(users.get("Alice"), Some(&5));
        assert_eq!(replies.len(), 3);

        let Envelope::Message(welcome) = decode(&replies[0].1) else {
            panic!("expected welcome message");
        };
        assert!(welcome.is_system());
        assert_eq!(welcome.body, "Welcome to the chat, Alice!");

        assert_eq!(decode(&replies[1].1), Envelope::UserList { users: users.clone() });
        assert_eq!(decode(&replies[2].1), Envelope::Join { user: "Alice".into() });
        assert!(replies.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn chat_and_typing_are_echoed() {
        let mut users = Roster::new();
        let typing = r#"{"type":"typing","user":"Alice"}"#;
        assert_eq!(respond(typing, &mut users, 0, Utc::now()), vec![(
            Duration::from_millis(50),
            typing.to_owned()
        )]);

        let message =
            r#"{"type":"message","user":"Alice","text":"hi","timestamp":"2024-05-01T10:00:00Z"}"#;
        assert_eq!(respond(message, &mut users, 0, Utc::now()).len(), 1);
        assert!(users.is_empty());
    }

    #[test]
    fn garbage_is_ignored() {
        let mut users = Roster::new();
        assert!(respond("{nope", &mut users, 0, Utc::now()).is_empty());
        assert!(respond(r#"{"type":"reaction"}"#, &mut users, 0, Utc::now()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_replies() {
        let mut connector = LoopbackConnector::default();
        let (events, mut rx) = mpsc::unbounded_channel();
        let mut channel = connector.connect(ChannelId(1), events);

        assert_eq!(rx.recv().await, Some(ChannelEvent::new(ChannelId(1), ChannelEventKind::Open)));
        channel.send(r#"{"type":"join","user":"Alice"}"#.to_owned()).unwrap();
        channel.close();

        assert!(channel.send("late".to_owned()).is_err());
        assert_eq!(rx.recv().await, None);
    }
}
