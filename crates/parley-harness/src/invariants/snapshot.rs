//! Observable state snapshots for invariant checking.
//!
//! Invariants operate on snapshots rather than live state so a check sees
//! one consistent moment.

use std::collections::BTreeSet;

use parley_core::{ChannelId, SessionState};
use parley_proto::Roster;

/// Snapshot of a session's observable state.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Lifecycle state.
    pub state: SessionState,
    /// Channel whose events are accepted.
    pub active_channel: Option<ChannelId>,
    /// Current roster.
    pub roster: Roster,
    /// Participants currently typing.
    pub typing: BTreeSet<String>,
    /// Value of the most recent `ConnectionStatusChanged`, if any.
    pub last_status: Option<bool>,
    /// Whether any timer is pending.
    pub has_deadline: bool,
    /// Channel the driver was told to open and has not opened yet.
    pub pending_open: Option<ChannelId>,
}

impl SessionSnapshot {
    /// Snapshot of a freshly created session.
    pub fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            active_channel: None,
            roster: Roster::new(),
            typing: BTreeSet::new(),
            last_status: None,
            has_deadline: false,
            pending_open: None,
        }
    }

    /// True while `Connected`.
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }
}
