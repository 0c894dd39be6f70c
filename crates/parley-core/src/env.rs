//! Environment abstraction for deterministic testing.
//!
//! Decouples session logic from system resources (time, randomness). The
//! production client plugs in the system clock and OS entropy; the simulation
//! harness plugs in a virtual clock and a seeded RNG.

use std::{
    fmt::Debug,
    future::Future,
    ops::{Add, Sub},
    time::Duration,
};

use chrono::{DateTime, Utc};

/// Monotonic point in time usable by the state machines.
///
/// Implemented for anything that behaves like [`std::time::Instant`]:
/// `std::time::Instant`, `tokio::time::Instant` and virtual instants.
pub trait MonotonicInstant:
    Copy + Ord + Debug + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = Self>
{
}

impl<T> MonotonicInstant for T where
    T: Copy + Ord + Debug + Send + Sync + Sub<Output = Duration> + Add<Duration, Output = T>
{
}

/// Abstract environment providing time, randomness, and async sleep.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - Given the same seed, a simulated `random_bytes()` yields the same bytes
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type used by this environment.
    ///
    /// Production uses `tokio::time::Instant`, simulation uses virtual time.
    type Instant: MonotonicInstant;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Sleep for the specified duration.
    ///
    /// Only driver code sleeps; the state machines never do.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Fill the buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Wall-clock time, used to stamp outbound messages.
    fn wall_clock(&self) -> DateTime<Utc>;

    /// Generate a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
