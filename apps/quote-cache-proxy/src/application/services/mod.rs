//! Application Services
//!
//! - `QuoteCacheProxy`: fetches a chart from the upstream provider and tags
//!   it with a cache validator

use std::sync::Arc;
use std::time::Duration;

use quote_domain::{ParsePeriodError, QuoteRequest, SymbolError};

use crate::application::ports::{UpstreamError, UpstreamPort};
use crate::domain::cache::{CachedQuoteResponse, canonicalize};

// =============================================================================
// Errors
// =============================================================================

/// Failure kinds surfaced to callers of the proxy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    /// Malformed symbol or period. Caller error, never retried.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network failure, timeout, 5xx or unreadable payload. Transient.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Provider refused the request with a 4xx status.
    #[error("upstream rejected request with status {status}: {message}")]
    UpstreamRejected {
        /// Provider status code.
        status: u16,
        /// Provider message.
        message: String,
    },
}

impl ProxyError {
    /// Stable machine-readable kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::UpstreamRejected { .. } => "upstream_rejected",
        }
    }

    /// Whether retrying with backoff may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable(_))
    }
}

impl From<UpstreamError> for ProxyError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { status, body } if (400..500).contains(&status) => {
                Self::UpstreamRejected {
                    status,
                    message: body,
                }
            }
            other => Self::UpstreamUnavailable(other.to_string()),
        }
    }
}

impl From<SymbolError> for ProxyError {
    fn from(err: SymbolError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl From<ParsePeriodError> for ProxyError {
    fn from(err: ParsePeriodError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

// =============================================================================
// Quote Cache Proxy
// =============================================================================

/// Fetches charts upstream and wraps them in cacheable responses.
///
/// Holds no cache store of its own: freshness and reuse are decided by the
/// HTTP caches that see the validator. Requests are independent and may run
/// concurrently.
#[derive(Clone)]
pub struct QuoteCacheProxy {
    upstream: Arc<dyn UpstreamPort>,
    fresh_for: Duration,
}

impl QuoteCacheProxy {
    /// Create a proxy over an upstream port.
    #[must_use]
    pub fn new(upstream: Arc<dyn UpstreamPort>, fresh_for: Duration) -> Self {
        Self {
            upstream,
            fresh_for,
        }
    }

    /// Freshness window attached to every response.
    #[must_use]
    pub const fn fresh_for(&self) -> Duration {
        self.fresh_for
    }

    /// Fetch a chart and tag it with its validator.
    ///
    /// # Errors
    ///
    /// `UpstreamRejected` for provider 4xx responses, `UpstreamUnavailable`
    /// for everything else that prevents a usable payload.
    pub async fn fetch(&self, request: &QuoteRequest) -> Result<CachedQuoteResponse, ProxyError> {
        let raw = self.upstream.get_chart(request).await.map_err(|e| {
            tracing::warn!(
                symbol = %request.symbol,
                period = %request.period,
                error = %e,
                "Upstream fetch failed"
            );
            ProxyError::from(e)
        })?;

        let payload = canonicalize(&raw).map_err(|e| {
            tracing::warn!(
                symbol = %request.symbol,
                period = %request.period,
                error = %e,
                bytes = raw.len(),
                "Upstream payload is not valid JSON"
            );
            ProxyError::UpstreamUnavailable(format!("malformed upstream payload: {e}"))
        })?;

        let response = CachedQuoteResponse::new(payload, self.fresh_for);

        tracing::debug!(
            symbol = %request.symbol,
            period = %request.period,
            validator = %response.validator(),
            bytes = response.payload().len(),
            "Chart fetched"
        );

        Ok(response)
    }
}

impl std::fmt::Debug for QuoteCacheProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteCacheProxy")
            .field("fresh_for", &self.fresh_for)
            .finish_non_exhaustive()
    }
}
