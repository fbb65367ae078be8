//! Duplicate suppression.

/// Passes a value only if it differs from the previously admitted one.
#[derive(Debug, Clone)]
pub struct Distinct<T> {
    last: Option<T>,
}

impl<T> Default for Distinct<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T: PartialEq + Clone> Distinct<T> {
    /// Create an empty filter; the first value always passes.
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Admit `value` if it is a change.
    pub fn admit(&mut self, value: T) -> Option<T> {
        if self.last.as_ref() == Some(&value) {
            return None;
        }
        self.last = Some(value.clone());
        Some(value)
    }

    /// Replace the remembered value without emitting.
    pub fn reseed(&mut self, value: T) {
        self.last = Some(value);
    }

    /// Last admitted or reseeded value.
    #[must_use]
    pub const fn last(&self) -> Option<&T> {
        self.last.as_ref()
    }
}
