//! Deterministic simulation harness for Parley session testing.
//!
//! Virtual-time implementation of the Environment trait plus a driver that
//! plays the runtime's role against an in-memory transport, so every session
//! behavior can be replayed exactly.
//!
//! # Model-Based Testing
//!
//! [`Operation`] enumerates everything that can happen to a session. Random
//! operation sequences are replayed through a [`SimDriver`] by proptest and
//! by the fuzzer.
//!
//! # Invariant Testing
//!
//! The `invariants` module verifies WHAT must be true across all execution
//! paths, not specific scenarios. Use [`InvariantRegistry::standard()`] for
//! the session invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod operation;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    ChannelMatchesState, ConnectingHasPendingOpen, Invariant, InvariantRegistry, InvariantResult,
    ReconnectScheduled, RosterRequiresConnection, SessionSnapshot, StatusReflectsState,
    TypingRequiresConnection, Violation,
};
pub use operation::{Inbound, Operation, PARTICIPANTS, ParticipantId, participant};
pub use sim_driver::{LOCAL_NAME, SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
