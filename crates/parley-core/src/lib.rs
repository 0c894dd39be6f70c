//! Parley session core
//!
//! Sans-IO state machines for a real-time chat client: connection lifecycle,
//! envelope routing, presence and typing. Drivers feed [`SessionEvent`]s in
//! and execute the [`SessionAction`]s that come back; nothing in this crate
//! performs I/O or sleeps.
//!
//! # Components
//!
//! - [`Session`]: lifecycle state machine and sole owner of all mutable state
//! - [`Dispatcher`]: envelope decode, routing table and outbound encoding
//! - [`PresenceRegistry`]: roster of participants with stable avatar colors
//! - [`TypingTracker`]: remote typing expiry plus local keystroke debounce
//! - [`Backoff`]: reconnect delay policy
//! - [`Environment`]: time and randomness, swapped out for simulation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backoff;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod event;
pub mod identity;
pub mod presence;
pub mod session;
pub mod typing;

pub use backoff::{Backoff, BackoffConfig};
pub use dispatch::Dispatcher;
pub use env::{Environment, MonotonicInstant};
pub use error::SessionError;
pub use event::{ChannelId, Notification, SessionAction, SessionEvent};
pub use identity::{guest_identity, normalize_identity};
pub use presence::PresenceRegistry;
pub use session::{Session, SessionConfig, SessionState};
pub use typing::{LocalSignal, TypingTracker};
