//! Date Range Bucketing and Validation
//!
//! Pure functions that turn a `(from, to)` date range into one of the
//! provider's discrete chart periods.
//!
//! # Buckets
//!
//! | Days (rounded up) | Period |
//! |-------------------|--------|
//! | ≤ 31              | `1m`   |
//! | ≤ 93              | `3m`   |
//! | ≤ 186             | `6m`   |
//! | ≤ 365             | `1y`   |
//! | ≤ 730             | `2y`   |
//! | ≤ 1825            | `5y`   |
//! | otherwise         | `max`  |
//!
//! `ytd` is never chosen by bucketing; it is only reachable by selecting it
//! directly.

use chrono::{DateTime, Utc};
use quote_domain::PeriodCode;

/// Milliseconds in one day.
pub const MILLIS_PER_DAY: u64 = 86_400_000;

/// Whole days spanned by a range, rounded up. Order of the endpoints does
/// not matter.
#[must_use]
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    (to - from)
        .num_milliseconds()
        .unsigned_abs()
        .div_ceil(MILLIS_PER_DAY)
}

/// Smallest period covering the given number of days.
#[must_use]
pub const fn bucket_days(days: u64) -> PeriodCode {
    match days {
        0..=31 => PeriodCode::OneMonth,
        32..=93 => PeriodCode::ThreeMonths,
        94..=186 => PeriodCode::SixMonths,
        187..=365 => PeriodCode::OneYear,
        366..=730 => PeriodCode::TwoYears,
        731..=1825 => PeriodCode::FiveYears,
        _ => PeriodCode::Max,
    }
}

/// Period covering a date range.
#[must_use]
pub fn bucket_range(from: DateTime<Utc>, to: DateTime<Utc>) -> PeriodCode {
    bucket_days(days_between(from, to))
}

/// Outcome of checking a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeCheck {
    /// Start of the range (never altered).
    pub from: DateTime<Utc>,
    /// End of the range, after correction.
    pub to: DateTime<Utc>,
    /// `from` is not in the future.
    pub from_valid: bool,
    /// `to` is not before `from`.
    pub to_valid: bool,
    /// `to` was replaced by `from`.
    pub corrected: bool,
}

/// Check a date range against the current instant.
///
/// An inverted range, or one starting in the future, collapses to the single
/// day `from..from`.
#[must_use]
pub fn validate_range(from: DateTime<Utc>, to: DateTime<Utc>, now: DateTime<Utc>) -> RangeCheck {
    let from_valid = from <= now;
    let to_valid = to >= from;
    let corrected = !from_valid || !to_valid;

    RangeCheck {
        from,
        to: if corrected { from } else { to },
        from_valid,
        to_valid,
        corrected,
    }
}
