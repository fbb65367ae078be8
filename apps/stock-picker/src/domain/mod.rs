//! Domain Layer - Form state and date range rules.
//!
//! Pure types and functions with no I/O or timers.

/// Date range bucketing and validation.
pub mod period;

/// Held selection and input change events.
pub mod selection;

pub use period::{RangeCheck, bucket_days, bucket_range, days_between, validate_range};
pub use selection::{ChangeError, Field, FieldChange, QuerySelection, parse_date, split_change_line};
