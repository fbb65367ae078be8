//! Retry policy with exponential backoff and jitter.

use std::time::Duration;

use rand::Rng;

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any delay.
    pub max_backoff: Duration,
    /// Growth factor between delays.
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10%).
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Start a backoff sequence for one call.
    #[must_use]
    pub const fn backoff(&self) -> Backoff<'_> {
        Backoff {
            policy: self,
            attempt: 0,
            current: self.initial_backoff,
        }
    }
}

/// Backoff state for a single call.
#[derive(Debug)]
pub struct Backoff<'a> {
    policy: &'a RetryPolicy,
    attempt: u32,
    current: Duration,
}

impl Backoff<'_> {
    /// Record a failed attempt and get the delay before the next one.
    ///
    /// Returns `None` once the attempt budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.policy.max_attempts {
            return None;
        }

        let delay = self.current;
        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.policy.multiplier)
                .min(self.policy.max_backoff.as_secs_f64()),
        );

        Some(apply_jitter(delay, self.policy.jitter_factor))
    }

    /// Failed attempts recorded so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempt
    }
}

fn apply_jitter(delay: Duration, jitter_factor: f64) -> Duration {
    if jitter_factor <= 0.0 || delay.is_zero() {
        return delay;
    }

    let base = delay.as_secs_f64();
    let range = base * jitter_factor;
    let jitter: f64 = rand::rng().random_range(-range..=range);
    Duration::from_secs_f64((base + jitter).max(0.001))
}
