//! Port Interfaces
//!
//! ## Driven Ports (Outbound)
//!
//! - `UpstreamPort`: fetches raw chart payloads from the quote provider

use std::time::Duration;

use async_trait::async_trait;
use quote_domain::QuoteRequest;

/// Failure reaching or reading from the upstream provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// Connection, TLS or body read failure.
    #[error("upstream network error: {0}")]
    Network(String),

    /// No response within the configured bound.
    #[error("upstream timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Provider answered with a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },
}

/// Port for fetching chart data from the upstream provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamPort: Send + Sync {
    /// Issue a single GET for the chart and return the raw body bytes.
    async fn get_chart(&self, request: &QuoteRequest) -> Result<Vec<u8>, UpstreamError>;
}
