//! Session invariants.
//!
//! The driver condenses a session into a [`SessionSnapshot`] after every
//! step, and each [`Invariant`] inspects that snapshot for one rule the
//! session must never break: presence only while connected, exactly one
//! live channel while connecting or connected, a status indicator that
//! matches the lifecycle, and no way to stall without a pending timer or
//! channel open.
//!
//! ```ignore
//! let mut driver = SimDriver::with_seed(7).with_invariants(InvariantRegistry::standard());
//! driver.apply(&Operation::Start)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    ChannelMatchesState, ConnectingHasPendingOpen, ReconnectScheduled, RosterRequiresConnection, StatusReflectsState,
    TypingRequiresConnection,
};
pub use snapshot::SessionSnapshot;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against session state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &SessionSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
///
/// Use [`InvariantRegistry::standard()`] for the session invariants.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard session invariants.
    ///
    /// Includes:
    /// - [`RosterRequiresConnection`]: roster empty unless connected
    /// - [`TypingRequiresConnection`]: typing set empty unless connected
    /// - [`ChannelMatchesState`]: an active channel exists exactly while
    ///   connecting or connected
    /// - [`StatusReflectsState`]: last connection notification agrees with
    ///   the state
    /// - [`ReconnectScheduled`]: reconnecting always has a deadline
    /// - [`ConnectingHasPendingOpen`]: connecting always waits on a channel
    ///   the driver was asked to open
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(RosterRequiresConnection);
        registry.add(TypingRequiresConnection);
        registry.add(ChannelMatchesState);
        registry.add(StatusReflectsState);
        registry.add(ReconnectScheduled);
        registry.add(ConnectingHasPendingOpen);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &SessionSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
