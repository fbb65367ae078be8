//! Debounce timer.

use std::time::{Duration, Instant};

/// Holds the latest value until it has been stable for a window.
///
/// A pushed value replaces (cancels) any pending one and restarts the
/// window. Nothing runs in the background: the owner polls with the current
/// time and awaits [`Debounce::deadline`] in between.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    window: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

impl<T> Debounce<T> {
    /// Create a debouncer with the given quiet window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Quiet window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Schedule a value, cancelling whatever was pending.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            value,
            deadline: now + self.window,
        });
    }

    /// When the pending value becomes due.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Release the pending value if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| now >= p.deadline) {
            self.pending.take().map(|p| p.value)
        } else {
            None
        }
    }

    /// Drop the pending value. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Whether a value is waiting.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
