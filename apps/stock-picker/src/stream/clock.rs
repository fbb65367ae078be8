//! Time sources.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Monotonic and wall-clock time.
pub trait Clock {
    /// Monotonic time, for timers.
    fn now(&self) -> Instant;

    /// Wall-clock time, for date validation.
    fn wall(&self) -> DateTime<Utc>;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-advanced clock for deterministic tests.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the code under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    now: Instant,
    wall: DateTime<Utc>,
}

impl ManualClock {
    /// Start at the given wall-clock time.
    #[must_use]
    pub fn starting_at(wall: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now: Instant::now(),
                wall,
            })),
        }
    }

    /// Move both clocks forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.now += by;
        state.wall += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.state.lock().now
    }

    fn wall(&self) -> DateTime<Utc> {
        self.state.lock().wall
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn manual_clock_advances_both_and_shares_state() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::starting_at(start);
        let handle = clock.clone();
        let t0 = clock.now();

        handle.advance(Duration::from_millis(300));

        assert_eq!(clock.now() - t0, Duration::from_millis(300));
        assert_eq!(clock.wall(), start + Duration::from_millis(300));
    }
}
