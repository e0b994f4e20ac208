//! Time source abstraction.
//!
//! Mirrors the driver/environment split the wider mesh agent uses for
//! deterministic testing: protocol/state-machine code never calls
//! [`std::time::SystemTime::now`] directly, it goes through a [`Clock`] so
//! tests can inject fixed or manually-advanced time.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// A source of wall-clock time, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + 'static {
    /// Current time, in milliseconds since the Unix epoch.
    fn now_unix_ms(&self) -> u64;
}

/// Production clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_ms(&self) -> u64 {
        #[allow(clippy::cast_possible_truncation, reason = "millis since epoch fits in u64 until year 584556")]
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_millis() as u64
    }
}

/// A clock whose value is set explicitly, for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    /// Construct a clock starting at `now_unix_ms`.
    #[must_use]
    pub fn new(now_unix_ms: u64) -> Self {
        Self(AtomicU64::new(now_unix_ms))
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        #[allow(clippy::cast_possible_truncation, reason = "test clock advances by small durations")]
        self.0.fetch_add(delta.as_millis() as u64, Ordering::SeqCst);
    }

    /// Set the clock to an explicit value.
    pub fn set(&self, now_unix_ms: u64) {
        self.0.store(now_unix_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_unix_ms(), 1_000);
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now_unix_ms(), 2_000);
        clock.set(5_000);
        assert_eq!(clock.now_unix_ms(), 5_000);
    }

    #[test]
    fn system_clock_reports_a_plausible_time() {
        // Any time after this crate was written.
        assert!(SystemClock.now_unix_ms() > 1_700_000_000_000);
    }
}
