//! Simulated environment with virtual time and seeded randomness.
//!
//! `SimEnv` never touches the system clock or OS entropy. Time only moves
//! when the test calls [`SimEnv::advance`] (or awaits [`Environment::sleep`],
//! which advances instantly), and every random byte comes from a ChaCha RNG
//! seeded at construction. Two runs with the same seed and the same inputs
//! produce the same outputs.

use std::{
    future::Future,
    ops::{Add, Sub},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use parley_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Point in virtual time, measured from the start of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Simulation start.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Time elapsed since the simulation started.
    pub fn since_start(self) -> Duration {
        self.0
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

struct SimState {
    now: SimInstant,
    rng: ChaCha8Rng,
}

/// Deterministic environment for simulation tests.
///
/// Cloning shares the clock and RNG.
#[derive(Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimState>>,
    epoch: DateTime<Utc>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Create an environment with seed 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create an environment with the given RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                now: SimInstant::ZERO,
                rng: ChaCha8Rng::seed_from_u64(seed),
            })),
            epoch: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Move virtual time forward.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.now = state.now + duration;
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        self.lock().now
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.now().since_start())
            .ok()
            .and_then(|elapsed| self.epoch.checked_add_signed(elapsed))
            .unwrap_or(self.epoch)
    }
}
