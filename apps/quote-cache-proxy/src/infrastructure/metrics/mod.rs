//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Upstream**: chart fetches by outcome and their latency
//! - **Revalidation**: conditional requests answered with 304
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the proxy port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::application::services::ProxyError;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "quote_proxy_upstream_requests_total",
        "Total chart fetches sent to the upstream provider, by outcome"
    );
    describe_histogram!(
        "quote_proxy_upstream_duration_seconds",
        "Upstream chart fetch latency"
    );
    describe_counter!(
        "quote_proxy_not_modified_total",
        "Conditional requests answered with 304 Not Modified"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for an upstream fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Payload fetched and tagged.
    Ok,
    /// Provider answered 4xx.
    Rejected,
    /// Network, timeout, 5xx or malformed payload.
    Unavailable,
}

impl FetchOutcome {
    /// Classify a fetch result.
    #[must_use]
    pub const fn of<T>(result: &Result<T, ProxyError>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(ProxyError::UpstreamRejected { .. }) => Self::Rejected,
            Err(ProxyError::UpstreamUnavailable(_) | ProxyError::InvalidRequest(_)) => {
                Self::Unavailable
            }
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Rejected => "rejected",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Record an upstream fetch and its latency.
pub fn record_upstream_fetch(outcome: FetchOutcome, duration: Duration) {
    counter!(
        "quote_proxy_upstream_requests_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!(
        "quote_proxy_upstream_duration_seconds",
        "outcome" => outcome.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Record a 304 Not Modified answer.
pub fn record_not_modified() {
    counter!("quote_proxy_not_modified_total").increment(1);
}

// =============================================================================
// Tests
// =============================================================================
