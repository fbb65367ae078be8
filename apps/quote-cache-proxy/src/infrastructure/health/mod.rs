//! Health Check and Metrics Endpoints
//!
//! Health checks, upstream status reporting and Prometheus metrics, served
//! from the same listener as the chart routes.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (fails once the upstream looks down)
//! - `GET /metrics` - Prometheus metrics in text format
//!
//! # Status
//!
//! Derived from consecutive upstream failures: none is healthy, fewer than
//! [`UNHEALTHY_AFTER`] is degraded, anything beyond is unhealthy. Provider
//! 4xx answers count as the upstream being reachable.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::application::services::ProxyError;
use crate::infrastructure::metrics::get_metrics_handle;

/// Consecutive upstream failures after which the proxy reports unhealthy.
pub const UNHEALTHY_AFTER: u32 = 5;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Proxy version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Upstream provider status.
    pub upstream: UpstreamStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Upstream answering.
    Healthy,
    /// Recent upstream failures.
    Degraded,
    /// Upstream appears down.
    Unhealthy,
}

impl HealthStatus {
    /// Status for a run of consecutive upstream failures.
    #[must_use]
    pub const fn from_consecutive_failures(failures: u32) -> Self {
        match failures {
            0 => Self::Healthy,
            n if n < UNHEALTHY_AFTER => Self::Degraded,
            _ => Self::Unhealthy,
        }
    }
}

/// Upstream counters at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamStatus {
    /// Upstream fetches attempted.
    pub requests: u64,
    /// Fetches that ended unavailable.
    pub failures: u64,
    /// Current run of unavailable fetches.
    pub consecutive_failures: u32,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
}

// =============================================================================
// Upstream Stats
// =============================================================================

/// Running upstream counters shared between handlers.
#[derive(Debug, Default)]
pub struct UpstreamStats {
    requests: AtomicU64,
    failures: AtomicU64,
    consecutive_failures: AtomicU32,
    last_error: RwLock<Option<String>>,
}

impl UpstreamStats {
    /// Create zeroed stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one upstream fetch.
    pub fn record<T>(&self, result: &Result<T, ProxyError>) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        match result {
            Err(err @ ProxyError::UpstreamUnavailable(_)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
                *self.last_error.write() = Some(err.to_string());
            }
            Ok(_) | Err(ProxyError::UpstreamRejected { .. } | ProxyError::InvalidRequest(_)) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
        }
    }

    /// Snapshot the counters.
    #[must_use]
    pub fn snapshot(&self) -> UpstreamStatus {
        UpstreamStatus {
            requests: self.requests.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
            last_error: self.last_error.read().clone(),
        }
    }
}

// =============================================================================
// Health State
// =============================================================================

/// Shared state for the health endpoints.
#[derive(Debug)]
pub struct HealthState {
    version: String,
    started_at: Instant,
    stats: Arc<UpstreamStats>,
}

impl HealthState {
    /// Create health state over shared upstream stats.
    #[must_use]
    pub fn new(version: String, stats: Arc<UpstreamStats>) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            stats,
        }
    }

    fn response(&self) -> HealthResponse {
        let upstream = self.stats.snapshot();
        HealthResponse {
            status: HealthStatus::from_consecutive_failures(upstream.consecutive_failures),
            version: self.version.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            current_time: Utc::now(),
            upstream,
        }
    }
}

/// Router serving the health and metrics endpoints.
pub fn health_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let response = state.response();
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    if state.response().status == HealthStatus::Unhealthy {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    } else {
        (StatusCode::OK, "READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use test_case::test_case;
    use tower::ServiceExt;

    use super::*;

    fn unavailable() -> Result<(), ProxyError> {
        Err(ProxyError::UpstreamUnavailable("connection refused".to_string()))
    }

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test_case(0, HealthStatus::Healthy)]
    #[test_case(1, HealthStatus::Degraded)]
    #[test_case(4, HealthStatus::Degraded)]
    #[test_case(5, HealthStatus::Unhealthy)]
    #[test_case(40, HealthStatus::Unhealthy)]
    fn status_from_failures(failures: u32, expected: HealthStatus) {
        assert_eq!(HealthStatus::from_consecutive_failures(failures), expected);
    }

    #[test]
    fn stats_track_failure_runs() {
        let stats = UpstreamStats::new();
        stats.record(&unavailable());
        stats.record(&unavailable());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.failures, 2);
        assert_eq!(snapshot.consecutive_failures, 2);
        assert_eq!(
            snapshot.last_error.as_deref(),
            Some("upstream unavailable: connection refused")
        );

        stats.record::<()>(&Err(ProxyError::UpstreamRejected {
            status: 404,
            message: "Unknown symbol".to_string(),
        }));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.requests, 3);
        assert_eq!(snapshot.failures, 2);
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(snapshot.last_error.is_some());
    }

    #[tokio::test]
    async fn readiness_follows_upstream() {
        let stats = Arc::new(UpstreamStats::new());
        let router = health_router(Arc::new(HealthState::new(
            "0.1.0".to_string(),
            Arc::clone(&stats),
        )));

        let response = router
            .clone()
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        for _ in 0..UNHEALTHY_AFTER {
            stats.record(&unavailable());
        }

        let response = router
            .clone()
            .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["upstream"]["consecutive_failures"], 5);
    }

    #[tokio::test]
    async fn liveness_always_ok() {
        let router = health_router(Arc::new(HealthState::new(
            "0.1.0".to_string(),
            Arc::new(UpstreamStats::new()),
        )));
        let response = router
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
