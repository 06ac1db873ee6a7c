// SPDX-License-Identifier: MIT

//! Time abstraction so schedules, timeouts, and staleness checks can be
//! tested without sleeping real wall-clock time.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Source of truth for "now", abstracted so tests can control time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Monotonic instant, for measuring durations and deadlines.
    fn now(&self) -> Instant;

    /// Wall-clock time, for timestamps persisted to storage and schedule math.
    fn utc_now(&self) -> DateTime<Utc>;

    /// Milliseconds since the Unix epoch, matching the wire representation
    /// used throughout the event bus.
    fn epoch_ms(&self) -> u64 {
        self.utc_now().timestamp_millis().max(0) as u64
    }
}

/// Real clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug)]
struct FakeClockState {
    instant: Instant,
    utc: DateTime<Utc>,
}

/// Deterministic clock for tests: starts pinned at construction time and only
/// moves when explicitly advanced.
#[derive(Debug, Clone)]
pub struct FakeClock {
    state: Arc<Mutex<FakeClockState>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeClockState {
                instant: Instant::now(),
                utc: Utc::now(),
            })),
        }
    }

    pub fn at(utc: DateTime<Utc>) -> Self {
        let clock = Self::new();
        clock.set(utc);
        clock
    }

    /// Advance both the monotonic and wall-clock readings by `duration`.
    pub fn advance(&self, duration: std::time::Duration) {
        let mut state = self.state.lock();
        state.instant += duration;
        state.utc += chrono::Duration::from_std(duration).unwrap_or_default();
    }

    /// Pin wall-clock time to an explicit value, leaving the monotonic clock
    /// untouched (tests that only care about calendar math use this).
    pub fn set(&self, utc: DateTime<Utc>) {
        self.state.lock().utc = utc;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().instant
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.state.lock().utc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_both_readings() {
        let clock = FakeClock::new();
        let before_instant = clock.now();
        let before_utc = clock.utc_now();

        clock.advance(std::time::Duration::from_secs(60));

        assert!(clock.now() > before_instant);
        assert!(clock.utc_now() > before_utc);
    }

    #[test]
    fn fake_clock_set_pins_wall_clock() {
        let clock = FakeClock::new();
        let target = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        clock.set(target);
        assert_eq!(clock.utc_now(), target);
    }
}
