//! Error types for the session core.
//!
//! Only lifecycle requests can fail. Everything that arrives from the network
//! (bad envelopes, channel errors, closures) is recovered inside the session
//! and never surfaces as an error.

use thiserror::Error;

use crate::session::SessionState;

/// Errors returned from [`crate::Session::handle`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Display name was empty or whitespace only
    #[error("display name must not be empty")]
    InvalidIdentity,

    /// Lifecycle request not valid in the current state
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when the request arrived
        state: SessionState,
        /// Request that was attempted
        operation: &'static str,
    },
}
