//! Envelope decoding errors.

use thiserror::Error;

/// Errors produced while decoding an inbound envelope.
///
/// None of these are fatal to a session: the receiver logs the error, drops
/// the envelope and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input was not valid JSON.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// JSON object had no string `type` tag.
    #[error("envelope has no type tag")]
    MissingKind,

    /// Tag was recognised but the fields did not match its shape.
    #[error("invalid {kind} envelope: {reason}")]
    InvalidEnvelope {
        /// Tag of the envelope that failed to decode
        kind: String,
        /// Underlying deserializer message
        reason: String,
    },

    /// Tag is not one this client understands (strict mode only).
    #[error("unknown envelope kind: {0}")]
    UnknownKind(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
