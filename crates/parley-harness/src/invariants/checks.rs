//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use parley_core::SessionState;

use super::{Invariant, InvariantResult, SessionSnapshot, Violation};

/// Roster must be empty whenever the session is not connected.
///
/// A participant list shown while disconnected would be stale.
pub struct RosterRequiresConnection;

impl Invariant for RosterRequiresConnection {
    fn name(&self) -> &'static str {
        "roster_requires_connection"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if !state.is_connected() && !state.roster.is_empty() {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "state {:?} but roster has {:?}",
                    state.state,
                    state.roster.keys().collect::<Vec<_>>()
                ),
            });
        }
        Ok(())
    }
}

/// Typing set must be empty whenever the session is not connected.
pub struct TypingRequiresConnection;

impl Invariant for TypingRequiresConnection {
    fn name(&self) -> &'static str {
        "typing_requires_connection"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if !state.is_connected() && !state.typing.is_empty() {
            return Err(Violation {
                invariant: self.name(),
                message: format!("state {:?} but typing set is {:?}", state.state, state.typing),
            });
        }
        Ok(())
    }
}

/// An active channel exists exactly while connecting or connected.
///
/// Anything else means a retired channel could still be treated as live.
pub struct ChannelMatchesState;

impl Invariant for ChannelMatchesState {
    fn name(&self) -> &'static str {
        "channel_matches_state"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let expects_channel =
            matches!(state.state, SessionState::Connecting | SessionState::Connected);

        if expects_channel != state.active_channel.is_some() {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "state {:?} with active channel {:?}",
                    state.state, state.active_channel
                ),
            });
        }
        Ok(())
    }
}

/// The last connection indicator sent to the presenter agrees with the state.
///
/// No notification yet counts as "not connected".
pub struct StatusReflectsState;

impl Invariant for StatusReflectsState {
    fn name(&self) -> &'static str {
        "status_reflects_state"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        let shown = state.last_status.unwrap_or(false);
        if shown != state.is_connected() {
            return Err(Violation {
                invariant: self.name(),
                message: format!("indicator shows connected={shown} in state {:?}", state.state),
            });
        }
        Ok(())
    }
}

/// A reconnecting session always has a pending deadline.
///
/// Otherwise the driver would never tick it back to life.
pub struct ReconnectScheduled;

impl Invariant for ReconnectScheduled {
    fn name(&self) -> &'static str {
        "reconnect_scheduled"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.state == SessionState::Reconnecting && !state.has_deadline {
            return Err(Violation {
                invariant: self.name(),
                message: "reconnecting with no deadline".to_owned(),
            });
        }
        Ok(())
    }
}

/// A connecting session is waiting on a channel the driver actually opens.
///
/// If the open request was lost, nothing will ever report `Open` or a
/// failure, and the session hangs in `Connecting` with no timer.
pub struct ConnectingHasPendingOpen;

impl Invariant for ConnectingHasPendingOpen {
    fn name(&self) -> &'static str {
        "connecting_has_pending_open"
    }

    fn check(&self, state: &SessionSnapshot) -> InvariantResult {
        if state.state == SessionState::Connecting
            && (state.active_channel.is_none() || state.pending_open != state.active_channel)
        {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "connecting on {:?} but driver is opening {:?}",
                    state.active_channel, state.pending_open
                ),
            });
        }
        Ok(())
    }
}
