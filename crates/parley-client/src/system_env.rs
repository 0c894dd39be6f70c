//! Production Environment implementation using system time and RNG.
//!
//! # Capabilities
//!
//! - Tokio monotonic time (`tokio::time::Instant`), which tests can pause
//! - OS RNG (getrandom). Truly random, not reproducible
//! - Tokio async sleep for actual wall-clock delays
//! - `chrono::Utc::now()` for message timestamps

use std::time::Duration;

use chrono::{DateTime, Utc};
use parley_core::Environment;

/// Production environment using system time and OS randomness.
///
/// # Panics
///
/// Panics if the OS RNG fails. RNG failure indicates an OS-level problem and
/// nothing sensible can continue without it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sleep_advances_time() {
        let env = SystemEnv::new();

        let start = env.now();
        env.sleep(Duration::from_millis(50)).await;
        let elapsed = env.now() - start;

        assert!(elapsed >= Duration::from_millis(50), "Sleep should wait at least 50ms");
    }

    #[test]
    fn random_bytes_fill_buffer() {
        let env = SystemEnv::new();

        let mut bytes1 = [0u8; 32];
        let mut bytes2 = [0u8; 32];
        env.random_bytes(&mut bytes1);
        env.random_bytes(&mut bytes2);

        // Extremely unlikely to be equal if random
        assert_ne!(bytes1, bytes2, "Random bytes should differ");
    }

    #[test]
    fn guest_names_are_in_range() {
        let env = SystemEnv::new();
        for _ in 0..32 {
            let name = parley_core::guest_identity(&env);
            let suffix: u64 = name.strip_prefix("Guest-").and_then(|n| n.parse().ok()).unwrap_or(u64::MAX);
            assert!(suffix < parley_core::identity::GUEST_SUFFIX_RANGE, "{name}");
        }
    }
}
