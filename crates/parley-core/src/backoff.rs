//! Reconnect backoff policy.
//!
//! Delay before attempt `n` (zero-based) is `min(initial * 2^n, max)`. The
//! attempt counter resets whenever a connection opens successfully. With
//! `max_attempts` set, the policy gives up once that many consecutive
//! attempts have been scheduled without an open in between.

use std::time::Duration;

/// Delay before the first reconnect attempt.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on any single reconnect delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Reconnect policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first attempt
    pub initial: Duration,
    /// Cap on the delay
    pub max: Duration,
    /// Consecutive attempts before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self { initial: DEFAULT_INITIAL_BACKOFF, max: DEFAULT_MAX_BACKOFF, max_attempts: None }
    }
}

impl BackoffConfig {
    /// Fixed delay, unlimited retries.
    pub fn fixed(delay: Duration) -> Self {
        Self { initial: delay, max: delay, max_attempts: None }
    }
}

/// Exponential backoff state.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempts: u32,
}

impl Backoff {
    /// Create a backoff with no attempts recorded.
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempts: 0 }
    }

    /// Delay before the next attempt, recording the attempt.
    ///
    /// Returns `None` once `max_attempts` is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts.is_some_and(|max| self.attempts >= max) {
            return None;
        }

        let factor = 2u32.saturating_pow(self.attempts);
        let delay = self.config.initial.saturating_mul(factor).min(self.config.max);
        self.attempts = self.attempts.saturating_add(1);
        Some(delay)
    }

    /// Forget previous attempts (after a successful open).
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Consecutive attempts scheduled since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
