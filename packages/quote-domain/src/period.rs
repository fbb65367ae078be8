//! Chart Period Codes
//!
//! The discrete range buckets the upstream provider accepts in place of
//! arbitrary date ranges.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Chart range bucket, ordered by the duration it implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PeriodCode {
    /// One month.
    #[serde(rename = "1m")]
    OneMonth,
    /// Three months.
    #[serde(rename = "3m")]
    ThreeMonths,
    /// Six months.
    #[serde(rename = "6m")]
    SixMonths,
    /// Year to date.
    #[serde(rename = "ytd")]
    YearToDate,
    /// One year.
    #[serde(rename = "1y")]
    OneYear,
    /// Two years.
    #[serde(rename = "2y")]
    TwoYears,
    /// Five years.
    #[serde(rename = "5y")]
    FiveYears,
    /// All available history.
    #[serde(rename = "max")]
    Max,
}

impl PeriodCode {
    /// Every period code, shortest first.
    pub const ALL: [Self; 8] = [
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::YearToDate,
        Self::OneYear,
        Self::TwoYears,
        Self::FiveYears,
        Self::Max,
    ];

    /// Wire code used in URL paths.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneMonth => "1m",
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::YearToDate => "ytd",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for PeriodCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodCode {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|period| period.as_str().eq_ignore_ascii_case(code))
            .ok_or_else(|| ParsePeriodError(code.to_string()))
    }
}

/// Raised for a string that is not one of the period wire codes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown period code: {0:?}")]
pub struct ParsePeriodError(pub String);
