//! Query Selection and Field Changes
//!
//! The held form state and the typed change events that update it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use quote_domain::{ParsePeriodError, PeriodCode};

/// Current values of every tracked input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySelection {
    /// Trimmed symbol text (may be empty).
    pub symbol: String,
    /// Range start, date-range mode.
    pub period_from: Option<DateTime<Utc>>,
    /// Range end, date-range mode.
    pub period_to: Option<DateTime<Utc>>,
    /// Selected period, period mode.
    pub period: Option<PeriodCode>,
}

/// An input the orchestrator tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Ticker symbol.
    Symbol,
    /// Range start.
    PeriodFrom,
    /// Range end.
    PeriodTo,
    /// Discrete period.
    Period,
}

impl Field {
    /// Field name as it appears in change events.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Symbol => "symbol",
            Self::PeriodFrom => "periodFrom",
            Self::PeriodTo => "periodTo",
            Self::Period => "period",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ChangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "symbol" => Ok(Self::Symbol),
            "periodFrom" | "period_from" | "from" => Ok(Self::PeriodFrom),
            "periodTo" | "period_to" | "to" => Ok(Self::PeriodTo),
            "period" => Ok(Self::Period),
            other => Err(ChangeError::UnknownField(other.to_string())),
        }
    }
}

/// A typed input change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    /// Raw symbol text.
    Symbol(String),
    /// New range start.
    PeriodFrom(DateTime<Utc>),
    /// New range end.
    PeriodTo(DateTime<Utc>),
    /// New discrete period.
    Period(PeriodCode),
}

impl FieldChange {
    /// Parse a raw value for a field.
    ///
    /// # Errors
    ///
    /// Returns `ChangeError` if a date or period value cannot be parsed.
    /// Symbol text is never rejected here.
    pub fn parse(field: Field, raw: &str) -> Result<Self, ChangeError> {
        match field {
            Field::Symbol => Ok(Self::Symbol(raw.to_string())),
            Field::PeriodFrom => parse_date(raw).map(Self::PeriodFrom),
            Field::PeriodTo => parse_date(raw).map(Self::PeriodTo),
            Field::Period => Ok(Self::Period(raw.parse()?)),
        }
    }

    /// Field this change applies to.
    #[must_use]
    pub const fn field(&self) -> Field {
        match self {
            Self::Symbol(_) => Field::Symbol,
            Self::PeriodFrom(_) => Field::PeriodFrom,
            Self::PeriodTo(_) => Field::PeriodTo,
            Self::Period(_) => Field::Period,
        }
    }
}

/// Split a `field=value` line.
///
/// # Errors
///
/// Returns `ChangeError` if the separator is missing or the field unknown.
pub fn split_change_line(line: &str) -> Result<(Field, &str), ChangeError> {
    let (field, value) = line
        .split_once('=')
        .ok_or_else(|| ChangeError::MissingSeparator(line.to_string()))?;
    Ok((field.parse()?, value))
}

/// Parse a date as `YYYY-MM-DD` (midnight UTC) or RFC 3339.
///
/// # Errors
///
/// Returns `ChangeError::InvalidDate` if neither form matches.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, ChangeError> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ChangeError::InvalidDate(raw.to_string()))
}

/// Rejected input change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChangeError {
    /// Line has no `=`.
    #[error("expected field=value, got {0:?}")]
    MissingSeparator(String),

    /// Field name not tracked.
    #[error("unknown field {0:?}")]
    UnknownField(String),

    /// Date in neither accepted form.
    #[error("invalid date {0:?}, expected YYYY-MM-DD or RFC 3339")]
    InvalidDate(String),

    /// Unknown period code.
    #[error(transparent)]
    InvalidPeriod(#[from] ParsePeriodError),
}
