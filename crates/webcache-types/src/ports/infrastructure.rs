//! Infrastructure ports for system-level concerns
//!
//! Clock and entropy abstractions keep the coordination protocol
//! deterministic under test: the backoff loop draws its sleep window from
//! [`Entropy`] and waits through [`Clock::sleep`], so a fake clock can run
//! the whole waiting/ready machine without real timers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// System clock abstraction
///
/// Production implementations return real wall-clock time and perform real
/// sleeps; test implementations can hold time still or advance it
/// instantly.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current UTC time
    fn now_utc(&self) -> DateTime<Utc>;

    /// Wait for the given duration
    async fn sleep(&self, duration: Duration);

    /// Current Unix timestamp in seconds
    fn timestamp(&self) -> i64 {
        self.now_utc().timestamp()
    }

    /// Current Unix timestamp in microseconds
    fn timestamp_micros(&self) -> i64 {
        self.now_utc().timestamp_micros()
    }
}

/// Entropy source abstraction
///
/// Provides the uniform draws used for contention backoff. Test
/// implementations can be seeded for reproducibility.
pub trait Entropy: Send + Sync {
    /// Uniform random integer in `[min, max)`; returns `min` when the
    /// range is empty
    fn random_range(&self, min: u64, max: u64) -> u64;
}

// ============================================================================
// Production implementations
// ============================================================================

/// Real system clock backed by chrono and tokio timers
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Thread-local RNG entropy source
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEntropy;

impl Entropy for SystemEntropy {
    fn random_range(&self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        use rand::Rng;
        rand::thread_rng().gen_range(min..max)
    }
}

// ============================================================================
// Test implementations
// ============================================================================

/// Controllable clock for deterministic tests
///
/// Time only moves when explicitly advanced; `sleep` advances the fake
/// time by the requested duration and returns immediately.
#[derive(Debug, Clone)]
pub struct FakeClock {
    time: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    /// Create a fake clock at the given instant
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }

    /// Create a fake clock at a fixed, arbitrary instant
    pub fn at_epoch() -> Self {
        Self::new(DateTime::from_timestamp(0, 0).unwrap_or_default())
    }

    /// Move the clock to a specific instant
    pub fn set_time(&self, time: DateTime<Utc>) {
        *self.time.lock().expect("clock mutex poisoned") = time;
    }

    /// Advance the clock by a duration
    pub fn advance(&self, duration: Duration) {
        let mut time = self.time.lock().expect("clock mutex poisoned");
        *time += chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::at_epoch()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.time.lock().expect("clock mutex poisoned")
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Seeded pseudo-random entropy for reproducible tests
#[derive(Debug, Clone)]
pub struct DeterministicEntropy {
    seed: Arc<Mutex<u64>>,
}

impl DeterministicEntropy {
    /// Create with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            seed: Arc::new(Mutex::new(seed)),
        }
    }

    // Linear congruential generator (Numerical Recipes constants)
    fn next_u64(&self) -> u64 {
        let mut seed = self.seed.lock().expect("entropy mutex poisoned");
        const A: u64 = 1664525;
        const C: u64 = 1013904223;
        *seed = seed.wrapping_mul(A).wrapping_add(C);
        *seed
    }
}

impl Default for DeterministicEntropy {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Entropy for DeterministicEntropy {
    fn random_range(&self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        min + self.next_u64() % (max - min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_clock_advances_on_sleep() {
        let clock = FakeClock::at_epoch();
        assert_eq!(clock.timestamp(), 0);

        clock.sleep(Duration::from_secs(30)).await;
        assert_eq!(clock.timestamp(), 30);

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now_utc().timestamp_millis(), 31_500);
    }

    #[test]
    fn test_fake_clock_set_time() {
        let clock = FakeClock::at_epoch();
        clock.set_time(DateTime::from_timestamp(1_600_000_000, 250_000_000).unwrap());
        assert_eq!(clock.timestamp(), 1_600_000_000);
        assert_eq!(clock.timestamp_micros(), 1_600_000_000_250_000);
    }

    #[test]
    fn test_deterministic_entropy_is_reproducible() {
        let a = DeterministicEntropy::new(42);
        let b = DeterministicEntropy::new(42);
        for _ in 0..16 {
            assert_eq!(a.random_range(0, 100), b.random_range(0, 100));
        }
    }

    #[test]
    fn test_entropy_range_bounds() {
        let entropy = DeterministicEntropy::new(7);
        for _ in 0..100 {
            let v = entropy.random_range(10, 20);
            assert!((10..20).contains(&v));
        }
        // Empty range collapses to min
        assert_eq!(entropy.random_range(5, 5), 5);
        assert_eq!(SystemEntropy.random_range(5, 5), 5);
    }
}
