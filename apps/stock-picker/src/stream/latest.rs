//! Latest-value slot.

/// One input's slot in a latest-value-wins join.
///
/// Empty until the input produces its first value; afterwards always holds
/// the most recent one.
#[derive(Debug, Clone)]
pub struct Latest<T> {
    value: Option<T>,
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> Latest<T> {
    /// Create an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { value: None }
    }

    /// Store a new value.
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    /// Current value, if the input has produced one.
    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Whether the input has produced a value.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

impl<T: Clone> Latest<T> {
    /// Copy of the current value.
    #[must_use]
    pub fn cloned(&self) -> Option<T> {
        self.value.clone()
    }
}
