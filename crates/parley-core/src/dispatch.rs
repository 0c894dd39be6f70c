//! Message dispatcher.
//!
//! Decodes inbound wire text into typed [`Envelope`]s, routes each kind to the
//! presence registry, the typing tracker or the presentation layer, and
//! encodes local user actions into outbound envelopes.
//!
//! # Routing
//!
//! | Kind          | Effect                                                |
//! |---------------|-------------------------------------------------------|
//! | `message`     | forwarded as a new message                            |
//! | `join`        | presence upsert                                       |
//! | `leave`       | presence remove, typing remove                        |
//! | `typing`      | typing add, expiry re-armed                           |
//! | `stop_typing` | typing remove, expiry cancelled                       |
//! | `user_list`   | roster replaced wholesale                             |
//! | `history`     | message log replaced wholesale                        |
//!
//! Roster and typing updates only apply while connected, so both stay empty
//! whenever the session is not.

use chrono::{DateTime, Utc};
use parley_proto::{DecodeError, DecodeMode, Envelope, Message};

use crate::{
    env::MonotonicInstant, event::Notification, presence::PresenceRegistry,
    typing::TypingTracker,
};

/// Envelope codec plus routing table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    mode: DecodeMode,
}

impl Dispatcher {
    /// Create a dispatcher with the given unknown-tag policy.
    pub fn new(mode: DecodeMode) -> Self {
        Self { mode }
    }

    /// Unknown-tag policy.
    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Decode raw wire text.
    ///
    /// `Ok(None)` means the envelope was an unknown kind and was skipped.
    pub fn decode(&self, raw: &str) -> Result<Option<Envelope>, DecodeError> {
        let decoded = Envelope::decode(raw, self.mode)?;
        if decoded.is_none() {
            tracing::debug!("skipping envelope of unknown kind");
        }
        Ok(decoded)
    }

    /// Encode a chat message. `None` if the body is blank after trimming.
    pub fn send_message(&self, sender: &str, body: &str, sent_at: DateTime<Utc>) -> Option<Envelope> {
        let text = body.trim();
        if text.is_empty() {
            return None;
        }
        Some(Envelope::Message(Message::new(sender, text, sent_at)))
    }

    /// Encode a `typing` signal.
    pub fn signal_typing(&self, sender: &str) -> Envelope {
        Envelope::Typing { user: sender.to_owned() }
    }

    /// Encode a `stop_typing` signal.
    pub fn signal_stop_typing(&self, sender: &str) -> Envelope {
        Envelope::StopTyping { user: sender.to_owned() }
    }

    /// Encode a `join` announcement.
    pub fn announce_join(&self, sender: &str) -> Envelope {
        Envelope::Join { user: sender.to_owned() }
    }

    /// Apply a decoded envelope and return the resulting notifications.
    pub fn route<I: MonotonicInstant>(
        &self,
        envelope: Envelope,
        presence: &mut PresenceRegistry,
        typing: &mut TypingTracker<I>,
        connected: bool,
        now: I,
    ) -> Vec<Notification> {
        let kind = envelope.kind();

        match envelope {
            Envelope::Message(message) => vec![Notification::MessageReceived(message)],
            Envelope::History { messages } => vec![Notification::HistoryLoaded(messages)],

            _ if !connected => {
                tracing::debug!(%kind, "dropping presence envelope while not connected");
                vec![]
            },

            Envelope::Join { user } => {
                let is_new = !presence.contains(&user);
                let color = presence.upsert(&user);
                tracing::debug!(user = %user, color, "participant joined");

                let mut notifications = Vec::with_capacity(2);
                if is_new {
                    notifications.push(roster_changed(presence));
                }
                notifications.push(Notification::ParticipantJoined(user));
                notifications
            },

            Envelope::Leave { user } => {
                let mut notifications = Vec::with_capacity(3);
                if presence.remove(&user) {
                    notifications.push(roster_changed(presence));
                }
                if typing.remote_stopped(&user) {
                    notifications.push(Notification::TypingSetChanged(typing.names()));
                }
                notifications.push(Notification::ParticipantLeft(user));
                notifications
            },

            Envelope::Typing { user } => {
                if typing.remote_typing(&user, now) {
                    vec![Notification::TypingSetChanged(typing.names())]
                } else {
                    vec![]
                }
            },

            Envelope::StopTyping { user } => {
                if typing.remote_stopped(&user) {
                    vec![Notification::TypingSetChanged(typing.names())]
                } else {
                    vec![]
                }
            },

            Envelope::UserList { users } => {
                presence.replace_all(users);
                vec![roster_changed(presence)]
            },
        }
    }
}

/// Roster notification reflecting the registry's current contents.
pub(crate) fn roster_changed(presence: &PresenceRegistry) -> Notification {
    Notification::RosterChanged { roster: presence.snapshot(), total: presence.count() }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::{Duration, Instant};

    use chrono::TimeZone;
    use parley_proto::Roster;

    use super::*;
    use crate::typing::{DEFAULT_TYPING_DEBOUNCE, DEFAULT_TYPING_EXPIRY};

    struct Fixture {
        dispatcher: Dispatcher,
        presence: PresenceRegistry,
        typing: TypingTracker<Instant>,
        now: Instant,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dispatcher: Dispatcher::default(),
                presence: PresenceRegistry::default(),
                typing: TypingTracker::new(DEFAULT_TYPING_EXPIRY, DEFAULT_TYPING_DEBOUNCE),
                now: Instant::now(),
            }
        }

        fn route(&mut self, envelope: Envelope) -> Vec<Notification> {
            self.dispatcher.route(envelope, &mut self.presence, &mut self.typing, true, self.now)
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 15, 0).unwrap()
    }

    #[test]
    fn blank_message_encodes_to_nothing() {
        let dispatcher = Dispatcher::default();
        assert_eq!(dispatcher.send_message("Alice", "   ", at()), None);
        assert_eq!(dispatcher.send_message("Alice", "", at()), None);
    }

    #[test]
    fn message_body_is_trimmed() {
        let dispatcher = Dispatcher::default();
        let envelope = dispatcher.send_message("Alice", "  hi there \n", at());
        assert_eq!(envelope, Some(Envelope::Message(Message::new("Alice", "hi there", at()))));
    }

    #[test]
    fn signals_carry_sender() {
        let dispatcher = Dispatcher::default();
        assert_eq!(dispatcher.signal_typing("A"), Envelope::Typing { user: "A".into() });
        assert_eq!(dispatcher.signal_stop_typing("A"), Envelope::StopTyping { user: "A".into() });
        assert_eq!(dispatcher.announce_join("A"), Envelope::Join { user: "A".into() });
    }

    #[test]
    fn message_does_not_touch_presence() {
        let mut fx = Fixture::new();
        let notes = fx.route(Envelope::Message(Message::new("Bob", "hey", at())));

        assert_eq!(notes, vec![Notification::MessageReceived(Message::new("Bob", "hey", at()))]);
        assert!(fx.presence.is_empty());
        assert!(fx.typing.is_empty());
    }

    #[test]
    fn join_adds_participant_without_typing() {
        let mut fx = Fixture::new();
        let notes = fx.route(Envelope::Join { user: "Bob".into() });

        assert!(fx.presence.contains("Bob"));
        assert!(!fx.typing.is_typing("Bob"));
        assert!(matches!(notes.as_slice(), [
            Notification::RosterChanged { total: 1, .. },
            Notification::ParticipantJoined(name),
        ] if name == "Bob"));
    }

    #[test]
    fn repeated_join_does_not_change_roster() {
        let mut fx = Fixture::new();
        fx.route(Envelope::Join { user: "Bob".into() });
        let notes = fx.route(Envelope::Join { user: "Bob".into() });

        assert_eq!(notes, vec![Notification::ParticipantJoined("Bob".into())]);
    }

    #[test]
    fn leave_removes_presence_and_typing() {
        let mut fx = Fixture::new();
        fx.route(Envelope::Join { user: "Bob".into() });
        fx.route(Envelope::Typing { user: "Bob".into() });

        let notes = fx.route(Envelope::Leave { user: "Bob".into() });

        assert!(!fx.presence.contains("Bob"));
        assert!(!fx.typing.is_typing("Bob"));
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[1], Notification::TypingSetChanged(Default::default()));
    }

    #[test]
    fn typing_refresh_is_silent() {
        let mut fx = Fixture::new();
        assert_eq!(fx.route(Envelope::Typing { user: "Bob".into() }).len(), 1);

        fx.now += Duration::from_secs(2);
        assert!(fx.route(Envelope::Typing { user: "Bob".into() }).is_empty());
    }

    #[test]
    fn stop_typing_for_unknown_user_is_silent() {
        let mut fx = Fixture::new();
        assert!(fx.route(Envelope::StopTyping { user: "Nobody".into() }).is_empty());
    }

    #[test]
    fn user_list_is_authoritative() {
        let mut fx = Fixture::new();
        fx.route(Envelope::Join { user: "Carol".into() });

        let users = Roster::from([("Alice".to_owned(), 0), ("Bob".to_owned(), 3)]);
        let notes = fx.route(Envelope::UserList { users: users.clone() });

        assert_eq!(fx.presence.roster(), &users);
        assert_eq!(notes, vec![Notification::RosterChanged { roster: users, total: 2 }]);
    }

    #[test]
    fn history_is_forwarded_whole() {
        let mut fx = Fixture::new();
        let notes = fx.route(Envelope::History { messages: vec![] });
        assert_eq!(notes, vec![Notification::HistoryLoaded(vec![])]);
    }

    #[test]
    fn presence_envelopes_dropped_while_disconnected() {
        let mut fx = Fixture::new();
        let notes = fx.dispatcher.route(
            Envelope::Join { user: "Bob".into() },
            &mut fx.presence,
            &mut fx.typing,
            false,
            fx.now,
        );

        assert!(notes.is_empty());
        assert!(fx.presence.is_empty());
    }
}
