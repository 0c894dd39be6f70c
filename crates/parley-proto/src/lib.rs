//! Parley wire protocol
//!
//! Every unit exchanged over a Parley channel is an [`Envelope`]: a JSON
//! object discriminated by a `type` tag. This crate owns the wire format and
//! nothing else; routing and state live in `parley-core`.
//!
//! # Forward compatibility
//!
//! Peers may introduce envelope kinds this crate does not know about.
//! [`Envelope::decode`] in [`DecodeMode::Permissive`] returns `Ok(None)` for
//! those instead of failing, so older clients keep working against newer
//! servers.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;
pub mod errors;
pub mod message;

pub use envelope::{DecodeMode, Envelope, EnvelopeKind, Roster};
pub use errors::DecodeError;
pub use message::{Message, SYSTEM_SENDER};
