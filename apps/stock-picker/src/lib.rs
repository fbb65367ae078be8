#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value
    )
)]

//! Stock Picker - Chart Query Orchestration
//!
//! Client side of the stock chart pipeline: turns noisy symbol and date
//! input into a minimal stream of `(symbol, period)` requests and fetches
//! them from the quote cache proxy.
//!
//! # Modules
//!
//! - `domain`: selection state, date parsing, range validation and bucketing
//! - `stream`: debounce, distinct, latest-value slots, clocks and sinks
//! - `orchestrator`: `QueryOrchestrator`, the input pipeline
//! - `client`: `QuoteProxyClient` with ETag revalidation and retries
//! - `chart`: payload to `(period, close)` series
//! - `config`: environment configuration
//!
//! # Data Flow
//!
//! ```text
//! field=value ──► QueryOrchestrator ──► QuoteRequest ──► QuoteProxyClient ──► proxy
//!                                                               │
//!                                                               ▼
//!                                                         chart series
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Selection state and date range rules.
pub mod domain;

/// Stream stabilization primitives.
pub mod stream;

/// Input pipeline producing quote requests.
pub mod orchestrator;

/// HTTP client for the quote cache proxy.
pub mod client;

/// Chart payload mapping.
pub mod chart;

/// Configuration loading.
pub mod config;

// =============================================================================
// Re-exports
// =============================================================================

pub use chart::{ChartPoint, ChartSummary, chart_series};
pub use client::{
    ChartResponse, ClientError, ClientSettings, QuoteProxyClient, ResponseSource, RetryPolicy,
};
pub use config::{ConfigError, PickerConfig};
pub use domain::{
    ChangeError, Field, FieldChange, QuerySelection, RangeCheck, bucket_days, bucket_range,
    days_between, validate_range,
};
pub use orchestrator::{InputMode, OrchestratorSettings, ParseModeError, QueryOrchestrator};
pub use stream::{Clock, ManualClock, QuoteSink, SystemClock};
