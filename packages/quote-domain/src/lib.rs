#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Quote Domain
//!
//! Value types that travel between the stock picker and the quote cache
//! proxy. A [`QuoteRequest`] is the canonical unit of work: a validated
//! [`Symbol`] plus a [`PeriodCode`] bucket understood by the upstream
//! provider.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

mod period;
mod request;
mod symbol;

pub use period::{ParsePeriodError, PeriodCode};
pub use request::QuoteRequest;
pub use symbol::{Symbol, SymbolError};
