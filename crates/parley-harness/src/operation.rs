//! Operations for model-based testing.
//!
//! Operations represent everything that can happen to a client session: user
//! input, server traffic, transport failures and the passage of time. They
//! are generated randomly (by proptest or the fuzzer) and replayed through a
//! [`crate::SimDriver`].

use arbitrary::Arbitrary;
use chrono::{DateTime, Utc};
use parley_proto::{Envelope, Message, Roster};

/// Participant identifier, mapped to a small fixed set of names.
pub type ParticipantId = u8;

/// Names used for remote participants.
pub const PARTICIPANTS: [&str; 4] = ["Bob", "Carol", "Dave", "Erin"];

/// Name of a participant id.
pub fn participant(id: ParticipantId) -> &'static str {
    PARTICIPANTS[usize::from(id) % PARTICIPANTS.len()]
}

/// Operations that can be applied to a session.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// User picks a name and starts.
    Start,

    /// User closes the client.
    End,

    /// Transport finishes opening the pending channel.
    Open,

    /// Active channel closes.
    Close,

    /// Active channel errors.
    Fail,

    /// Server sends something on the active channel.
    Deliver(Inbound),

    /// Server sends something on an already-retired channel.
    DeliverStale(Inbound),

    /// User presses a key.
    Keystroke,

    /// User submits a message.
    Send {
        /// Whether the body is blank
        blank: bool,
    },

    /// Advance virtual time.
    AdvanceTime {
        /// Milliseconds to advance
        millis: u16,
    },
}

/// Inbound traffic, kept small so generated cases stay readable.
#[derive(Debug, Clone, Arbitrary)]
pub enum Inbound {
    /// Chat message from a participant
    Message(ParticipantId),
    /// `join`
    Join(ParticipantId),
    /// `leave`
    Leave(ParticipantId),
    /// `typing`
    Typing(ParticipantId),
    /// `stop_typing`
    StopTyping(ParticipantId),
    /// `user_list`; each bit selects a participant
    UserList(u8),
    /// `history` with this many messages (mod 4)
    History(u8),
    /// Envelope of a kind nobody knows
    Unknown,
    /// Not JSON at all
    Garbage,
}

impl Inbound {
    /// Render as raw wire text.
    pub fn to_raw(&self) -> String {
        let envelope = match *self {
            Self::Message(id) => Envelope::Message(Message::new(
                participant(id),
                "hello",
                DateTime::<Utc>::UNIX_EPOCH,
            )),
            Self::Join(id) => Envelope::Join { user: participant(id).to_owned() },
            Self::Leave(id) => Envelope::Leave { user: participant(id).to_owned() },
            Self::Typing(id) => Envelope::Typing { user: participant(id).to_owned() },
            Self::StopTyping(id) => Envelope::StopTyping { user: participant(id).to_owned() },
            Self::UserList(mask) => {
                let users: Roster = PARTICIPANTS
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(i, name)| ((*name).to_owned(), u32::try_from(i).unwrap_or(0)))
                    .collect();
                Envelope::UserList { users }
            },
            Self::History(n) => Envelope::History {
                messages: (0..n % 4)
                    .map(|i| Message::new(participant(i), "earlier", DateTime::<Utc>::UNIX_EPOCH))
                    .collect(),
            },
            Self::Unknown => return r#"{"type":"reaction","emoji":"+1"}"#.to_owned(),
            Self::Garbage => return "{not json".to_owned(),
        };
        envelope.to_json()
    }
}
