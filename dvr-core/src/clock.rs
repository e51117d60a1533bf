//! Monotonic clock abstraction (spec §4.6, §9).
//!
//! The engine and scheduler never call `Instant::now()` directly; they go
//! through a `Clock` so tests can advance time deterministically instead of
//! sleeping for real.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A source of monotonic timestamps.
pub trait Clock: Send + Sync + 'static {
    /// Current instant, per this clock's own notion of time.
    fn now(&self) -> Instant;
}

/// The real wall clock, backed by `Instant::now()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only advances when told to, for deterministic tests of
/// expiry/ceiling behavior (spec §8).
pub struct TestClock {
    base: Instant,
    offset_millis: AtomicU64,
}

impl TestClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_millis: AtomicU64::new(0),
        }
    }

    /// Move the clock forward by `d`.
    pub fn advance(&self, d: Duration) {
        self.offset_millis
            .fetch_add(d.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_on_demand() {
        let clock = TestClock::new();
        let t0 = clock.now();
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), t0 + Duration::from_secs(5));
    }
}
