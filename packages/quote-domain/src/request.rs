//! Canonical quote request.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{PeriodCode, Symbol};

/// The de-duplicated unit of work sent from the picker to the proxy.
///
/// Two requests are equal iff their symbol and period are equal, which also
/// makes a request the cache key for its response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Ticker symbol.
    pub symbol: Symbol,
    /// Chart period bucket.
    pub period: PeriodCode,
}

impl QuoteRequest {
    /// Create a new request.
    #[must_use]
    pub const fn new(symbol: Symbol, period: PeriodCode) -> Self {
        Self { symbol, period }
    }

    /// Path of this chart below a `/quote` or `/beta/stock` prefix.
    #[must_use]
    pub fn chart_path(&self) -> String {
        format!("{}/chart/{}", self.symbol, self.period)
    }
}

impl fmt::Display for QuoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.symbol, self.period)
    }
}
