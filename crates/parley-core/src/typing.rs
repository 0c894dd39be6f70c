//! Typing activity tracker.
//!
//! Two independent concerns share this structure:
//!
//! - **Inbound**: remote participants flagged as typing, each with an expiry
//!   deadline. A `typing` signal re-arms the deadline, `stop_typing` or
//!   `leave` removes the entry, and [`TypingTracker::expire`] silently drops
//!   entries whose deadline has passed.
//! - **Outbound**: the local user's keystrokes, debounced so at most one
//!   `typing` signal goes out per window and exactly one `stop_typing`
//!   follows a window of silence.
//!
//! Timers are plain deadlines keyed by participant. Nothing here sleeps; the
//! owner polls with the current time and asks [`TypingTracker::next_deadline`]
//! when to poll next.

use std::{
    collections::{BTreeSet, HashMap},
    time::Duration,
};

use crate::env::MonotonicInstant;

/// How long a remote `typing` signal stays valid without a refresh.
pub const DEFAULT_TYPING_EXPIRY: Duration = Duration::from_secs(5);

/// Local debounce window for outbound typing signals.
pub const DEFAULT_TYPING_DEBOUNCE: Duration = Duration::from_secs(3);

/// Outbound typing signal the owner should send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalSignal {
    /// Send `typing`
    Typing,
    /// Send `stop_typing`
    StopTyping,
}

/// Debounce state for the local user.
#[derive(Debug, Clone, Copy)]
struct LocalTyping<I> {
    /// When the last `typing` signal went out. `None` while idle.
    last_signal: Option<I>,
    /// When `stop_typing` is due. `None` while idle.
    stop_at: Option<I>,
}

impl<I> Default for LocalTyping<I> {
    fn default() -> Self {
        Self { last_signal: None, stop_at: None }
    }
}

/// Per-participant typing state plus local debounce.
#[derive(Debug, Clone)]
pub struct TypingTracker<I> {
    expiry: Duration,
    debounce: Duration,
    /// Remote participant to expiry deadline
    remote: HashMap<String, I>,
    local: LocalTyping<I>,
}

impl<I: MonotonicInstant> TypingTracker<I> {
    /// Create a tracker with the given expiry and debounce windows.
    pub fn new(expiry: Duration, debounce: Duration) -> Self {
        Self { expiry, debounce, remote: HashMap::new(), local: LocalTyping::default() }
    }

    /// Record a remote `typing` signal, replacing any prior deadline.
    ///
    /// Returns `true` if `name` was not already in the set.
    pub fn remote_typing(&mut self, name: &str, now: I) -> bool {
        self.remote.insert(name.to_owned(), now + self.expiry).is_none()
    }

    /// Record a remote `stop_typing` (or `leave`), cancelling the deadline.
    ///
    /// Returns `true` if `name` was in the set.
    pub fn remote_stopped(&mut self, name: &str) -> bool {
        self.remote.remove(name).is_some()
    }

    /// Drop every remote entry whose deadline is at or before `now`.
    ///
    /// Returns `true` if anything was removed.
    pub fn expire(&mut self, now: I) -> bool {
        let before = self.remote.len();
        self.remote.retain(|_, deadline| *deadline > now);
        self.remote.len() != before
    }

    /// Register a local keystroke.
    ///
    /// Returns [`LocalSignal::Typing`] if no `typing` signal went out within
    /// the current debounce window. Always pushes the `stop_typing` deadline
    /// to one window after this keystroke.
    pub fn keystroke(&mut self, now: I) -> Option<LocalSignal> {
        self.local.stop_at = Some(now + self.debounce);

        let due = self.local.last_signal.is_none_or(|last| now - last >= self.debounce);
        if due {
            self.local.last_signal = Some(now);
            Some(LocalSignal::Typing)
        } else {
            None
        }
    }

    /// Fire the local `stop_typing` if its deadline has passed.
    pub fn poll_local(&mut self, now: I) -> Option<LocalSignal> {
        match self.local.stop_at {
            Some(stop_at) if stop_at <= now => {
                self.local = LocalTyping::default();
                Some(LocalSignal::StopTyping)
            },
            _ => None,
        }
    }

    /// Cancel the local debounce immediately (a message was just sent).
    ///
    /// The caller always sends `stop_typing` afterwards, so this returns the
    /// signal unconditionally.
    pub fn force_stop(&mut self) -> LocalSignal {
        self.local = LocalTyping::default();
        LocalSignal::StopTyping
    }

    /// True while the local user has an outstanding `typing` signal.
    pub fn is_local_typing(&self) -> bool {
        self.local.stop_at.is_some()
    }

    /// Cancel every inbound and outbound timer.
    ///
    /// Returns `true` if the remote set was non-empty.
    pub fn clear(&mut self) -> bool {
        let had_entries = !self.remote.is_empty();
        self.remote.clear();
        self.local = LocalTyping::default();
        had_entries
    }

    /// True if `name` is flagged as typing.
    pub fn is_typing(&self, name: &str) -> bool {
        self.remote.contains_key(name)
    }

    /// True if no remote participant is typing.
    pub fn is_empty(&self) -> bool {
        self.remote.is_empty()
    }

    /// Names currently typing, sorted.
    pub fn names(&self) -> BTreeSet<String> {
        self.remote.keys().cloned().collect()
    }

    /// Earliest pending deadline (remote expiry or local stop).
    pub fn next_deadline(&self) -> Option<I> {
        self.remote.values().copied().chain(self.local.stop_at).min()
    }
}
