//! Tagged envelopes.
//!
//! Envelopes are internally tagged JSON objects:
//!
//! ```text
//! { "type": "join",        "user": string }
//! { "type": "leave",       "user": string }
//! { "type": "message",     "user": string, "text": string, "timestamp": ISO8601 }
//! { "type": "typing",      "user": string }
//! { "type": "stop_typing", "user": string }
//! { "type": "user_list",   "users": { name: color_index } }
//! { "type": "history",     "messages": Message[] }
//! ```

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{errors::DecodeError, message::Message};

/// Display name to color index.
pub type Roster = BTreeMap<String, u32>;

/// How [`Envelope::decode`] treats tags it does not recognise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Unknown tags decode to `Ok(None)`.
    #[default]
    Permissive,
    /// Unknown tags are a [`DecodeError::UnknownKind`].
    Strict,
}

/// A single typed unit exchanged over a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Chat message
    Message(Message),
    /// Participant entered the room
    Join {
        /// Display name
        user: String,
    },
    /// Participant left the room
    Leave {
        /// Display name
        user: String,
    },
    /// Participant is typing
    Typing {
        /// Display name
        user: String,
    },
    /// Participant stopped typing
    StopTyping {
        /// Display name
        user: String,
    },
    /// Authoritative roster snapshot
    UserList {
        /// Every present participant and their color index
        users: Roster,
    },
    /// Message log replay, oldest first
    History {
        /// Messages in delivery order
        messages: Vec<Message>,
    },
}

/// Envelope discriminant, mirroring the wire `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    /// `message`
    Message,
    /// `join`
    Join,
    /// `leave`
    Leave,
    /// `typing`
    Typing,
    /// `stop_typing`
    StopTyping,
    /// `user_list`
    UserList,
    /// `history`
    History,
}

impl EnvelopeKind {
    /// Every kind this crate understands.
    pub const ALL: [Self; 7] = [
        Self::Message,
        Self::Join,
        Self::Leave,
        Self::Typing,
        Self::StopTyping,
        Self::UserList,
        Self::History,
    ];

    /// Wire tag.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Typing => "typing",
            Self::StopTyping => "stop_typing",
            Self::UserList => "user_list",
            Self::History => "history",
        }
    }

    /// Parse a wire tag. `None` if unknown.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Envelope {
    /// Decode raw wire text.
    ///
    /// Returns `Ok(None)` for an unknown tag in permissive mode.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Malformed`] if `raw` is not JSON
    /// - [`DecodeError::MissingKind`] if there is no string `type` field
    /// - [`DecodeError::InvalidEnvelope`] if the fields do not match the tag
    /// - [`DecodeError::UnknownKind`] for an unknown tag in strict mode
    pub fn decode(raw: &str, mode: DecodeMode) -> Result<Option<Self>, DecodeError> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        let tag = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(DecodeError::MissingKind)?
            .to_owned();

        if EnvelopeKind::from_tag(&tag).is_none() {
            return match mode {
                DecodeMode::Permissive => Ok(None),
                DecodeMode::Strict => Err(DecodeError::UnknownKind(tag)),
            };
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| DecodeError::InvalidEnvelope { kind: tag, reason: e.to_string() })
    }

    /// Encode to wire text.
    pub fn to_json(&self) -> String {
        // Every variant is a map of strings, integers and timestamps, none of
        // which can fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Discriminant of this envelope.
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Message(_) => EnvelopeKind::Message,
            Self::Join { .. } => EnvelopeKind::Join,
            Self::Leave { .. } => EnvelopeKind::Leave,
            Self::Typing { .. } => EnvelopeKind::Typing,
            Self::StopTyping { .. } => EnvelopeKind::StopTyping,
            Self::UserList { .. } => EnvelopeKind::UserList,
            Self::History { .. } => EnvelopeKind::History,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn decode(raw: &str) -> Result<Option<Envelope>, DecodeError> {
        Envelope::decode(raw, DecodeMode::Permissive)
    }

    #[test]
    fn join_wire_shape() {
        let envelope = Envelope::Join { user: "Alice".into() };
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json()).unwrap();
        assert_eq!(value, json!({ "type": "join", "user": "Alice" }));
    }

    #[test]
    fn stop_typing_uses_snake_case_tag() {
        let envelope = Envelope::StopTyping { user: "Bob".into() };
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json()).unwrap();
        assert_eq!(value, json!({ "type": "stop_typing", "user": "Bob" }));
    }

    #[test]
    fn message_fields_are_flattened() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let envelope = Envelope::Message(Message::new("Alice", "hello", at));
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json()).unwrap();

        assert_eq!(value["type"], "message");
        assert_eq!(value["user"], "Alice");
        assert_eq!(value["text"], "hello");
        assert!(value["timestamp"].as_str().unwrap().starts_with("2024-05-01T12:00:00"));
    }

    #[test]
    fn decodes_user_list() {
        let envelope = decode(r#"{"type":"user_list","users":{"Alice":0,"Bob":3}}"#)
            .unwrap()
            .unwrap();

        let Envelope::UserList { users } = envelope else {
            panic!("expected user_list");
        };
        assert_eq!(users.len(), 2);
        assert_eq!(users.get("Bob"), Some(&3));
    }

    #[test]
    fn decodes_empty_history() {
        let envelope = decode(r#"{"type":"history","messages":[]}"#).unwrap();
        assert_eq!(envelope, Some(Envelope::History { messages: vec![] }));
    }

    #[test]
    fn unknown_kind_is_ignored_when_permissive() {
        assert_eq!(decode(r#"{"type":"reaction","user":"A"}"#), Ok(None));
    }

    #[test]
    fn unknown_kind_is_rejected_when_strict() {
        let result = Envelope::decode(r#"{"type":"reaction"}"#, DecodeMode::Strict);
        assert_eq!(result, Err(DecodeError::UnknownKind("reaction".into())));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(decode("{not json"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn missing_tag_is_rejected() {
        assert_eq!(decode(r#"{"user":"A"}"#), Err(DecodeError::MissingKind));
        assert_eq!(decode(r#"{"type":7}"#), Err(DecodeError::MissingKind));
        assert_eq!(decode("[]"), Err(DecodeError::MissingKind));
    }

    #[test]
    fn wrong_fields_for_known_kind_are_rejected() {
        let result = decode(r#"{"type":"join"}"#);
        assert!(matches!(result, Err(DecodeError::InvalidEnvelope { ref kind, .. }) if kind == "join"));

        let result = decode(r#"{"type":"message","user":"A","text":"x","timestamp":"yesterday"}"#);
        assert!(matches!(result, Err(DecodeError::InvalidEnvelope { .. })));
    }

    #[test]
    fn negative_color_index_is_rejected() {
        let result = decode(r#"{"type":"user_list","users":{"A":-1}}"#);
        assert!(matches!(result, Err(DecodeError::InvalidEnvelope { .. })));
    }

    #[test]
    fn kind_tags_are_unique() {
        for kind in EnvelopeKind::ALL {
            assert_eq!(EnvelopeKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(EnvelopeKind::from_tag("Join"), None);
    }
}
