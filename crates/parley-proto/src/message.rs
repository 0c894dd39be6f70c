//! Chat message payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender name used by servers for synthetic announcements.
pub const SYSTEM_SENDER: &str = "System";

/// A single chat message.
///
/// On the wire the fields are named `user`, `text` and `timestamp`; the
/// timestamp is ISO-8601. The body is opaque: it is never truncated or
/// sanitized here, escaping is the renderer's job.
///
/// `sent_at` comes from the sender's clock, so a sequence of messages is not
/// guaranteed to be ordered by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Display name of the sender
    #[serde(rename = "user")]
    pub sender: String,

    /// Message text
    #[serde(rename = "text")]
    pub body: String,

    /// Sender-side timestamp
    #[serde(rename = "timestamp")]
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Create a message.
    pub fn new(sender: impl Into<String>, body: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self { sender: sender.into(), body: body.into(), sent_at }
    }

    /// True if the message was produced by the server rather than a user.
    pub fn is_system(&self) -> bool {
        self.sender == SYSTEM_SENDER
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parses_browser_style_timestamp() {
        let json = r#"{"user":"Bob","text":"hi","timestamp":"2024-05-01T12:30:00.000Z"}"#;
        let message: Message = serde_json::from_str(json).unwrap();

        assert_eq!(message.sender, "Bob");
        assert_eq!(message.body, "hi");
        assert_eq!(message.sent_at, Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn ignores_extra_fields() {
        // History entries often carry their original envelope tag
        let json = r#"{"type":"message","user":"A","text":"x","timestamp":"2024-05-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<Message>(json).is_ok());
    }

    #[test]
    fn system_sender_detection() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(Message::new(SYSTEM_SENDER, "welcome", at).is_system());
        assert!(!Message::new("Alice", "hello", at).is_system());
    }
}
