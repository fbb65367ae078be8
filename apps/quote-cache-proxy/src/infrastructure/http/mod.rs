//! Chart HTTP Server
//!
//! Axum routes for chart requests plus the health endpoints, on one listener.
//!
//! # Endpoints
//!
//! - `GET /quote/{symbol}/chart/{period}` - Chart payload with cache headers
//! - `GET /beta/stock/{symbol}/chart/{period}` - Same, under the provider's path
//!
//! Successful responses carry a strong `ETag`, `Cache-Control: private,
//! max-age=<secs>` and a JSON body. A request whose `If-None-Match` matches
//! the current validator gets `304 Not Modified` with no body. Failures are
//! answered as `{"error": <kind>, "message": <text>}`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use quote_domain::{PeriodCode, QuoteRequest, Symbol};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::application::services::{ProxyError, QuoteCacheProxy};
use crate::infrastructure::health::{HealthState, UpstreamStats, health_router};
use crate::infrastructure::metrics::{FetchOutcome, record_not_modified, record_upstream_fetch};

/// Response header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// =============================================================================
// State and Router
// =============================================================================

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Chart fetcher.
    pub proxy: QuoteCacheProxy,
    /// Upstream counters, shared with the health endpoints.
    pub stats: Arc<UpstreamStats>,
    /// Application version.
    pub version: String,
}

impl AppState {
    /// Create state with fresh upstream counters.
    #[must_use]
    pub fn new(proxy: QuoteCacheProxy, version: String) -> Self {
        Self {
            proxy,
            stats: Arc::new(UpstreamStats::new()),
            version,
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let health = health_router(Arc::new(HealthState::new(
        state.version.clone(),
        Arc::clone(&state.stats),
    )));

    Router::new()
        .route("/quote/{symbol}/chart/{period}", get(chart_handler))
        .route("/beta/stock/{symbol}/chart/{period}", get(chart_handler))
        .with_state(state)
        .merge(health)
}

// =============================================================================
// Handlers
// =============================================================================

async fn chart_handler(
    State(state): State<AppState>,
    Path((symbol, period)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "chart_request",
        request_id = %request_id,
        symbol = %symbol,
        period = %period,
    );

    let mut response = serve_chart(&state, &symbol, &period, &headers)
        .instrument(span)
        .await
        .unwrap_or_else(IntoResponse::into_response);

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn serve_chart(
    state: &AppState,
    symbol: &str,
    period: &str,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let symbol = Symbol::parse(symbol).map_err(|e| ApiError(e.into()))?;
    let period = period
        .parse::<PeriodCode>()
        .map_err(|e| ApiError(e.into()))?;
    let request = QuoteRequest::new(symbol, period);

    let started = Instant::now();
    let result = state.proxy.fetch(&request).await;
    record_upstream_fetch(FetchOutcome::of(&result), started.elapsed());
    state.stats.record(&result);
    let cached = result.map_err(ApiError)?;

    let etag = cached.validator().to_etag();
    let cache_control = cached.cache_control();

    let not_modified = headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| cached.validator().matches_if_none_match(v));

    if not_modified {
        record_not_modified();
        tracing::debug!(validator = %cached.validator(), "Validator matched");
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(ETAG, etag), (CACHE_CONTROL, cache_control)],
        )
            .into_response());
    }

    tracing::info!(validator = %cached.validator(), "Chart served");

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "application/json".to_string()),
            (ETAG, etag),
            (CACHE_CONTROL, cache_control),
        ],
        cached.into_payload(),
    )
        .into_response())
}

// =============================================================================
// Errors
// =============================================================================

/// Error body returned for failed chart requests.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable kind.
    pub error: &'static str,
    /// Human-readable detail.
    pub message: String,
}

/// Proxy error wrapper for axum responses.
#[derive(Debug)]
pub struct ApiError(pub ProxyError);

impl ApiError {
    /// HTTP status for this error.
    ///
    /// Provider 4xx codes pass through; unavailability maps to 502.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamRejected { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(StatusCode::is_client_error)
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ProxyError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Server
// =============================================================================

/// Chart HTTP server.
pub struct HttpServer {
    addr: SocketAddr,
    state: AppState,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(addr: SocketAddr, state: AppState, cancel: CancellationToken) -> Self {
        Self {
            addr,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the server hits a fatal
    /// error while running.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let app = create_router(self.state);

        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.addr, e.to_string()))?;

        tracing::info!(addr = %self.addr, "Quote proxy listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Quote proxy stopped");
        Ok(())
    }
}

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind the listener.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(SocketAddr, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
