#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Quote Cache Proxy - Chart Data Proxy
//!
//! An HTTP proxy in front of the upstream quote provider. Each chart request
//! is forwarded upstream, the payload is canonicalized, and the response is
//! tagged with a content-derived validator and a freshness window so
//! browsers and intermediaries can revalidate instead of refetching.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Cacheable responses and validators
//!   - `cache`: canonical payloads, `Validator`, `CachedQuoteResponse`
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: `UpstreamPort` for the quote provider
//!   - `services`: `QuoteCacheProxy`
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `provider`: reqwest client for the provider
//!   - `http`: axum chart routes and server
//!   - `config`: environment configuration
//!   - `health`: health, readiness and metrics endpoints
//!
//! # Data Flow
//!
//! ```text
//! Browser ──► GET /quote/{symbol}/chart/{period}
//!                 │
//!                 ▼
//!           QuoteCacheProxy ──► Provider GET /beta/stock/{symbol}/chart/{period}
//!                 │
//!                 ▼
//!           canonical JSON + ETag + Cache-Control ──► 200 or 304
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Cacheable response types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::cache::{CachedQuoteResponse, DEFAULT_FRESH_FOR, Validator, canonicalize};

// Application
pub use application::ports::{UpstreamError, UpstreamPort};
pub use application::services::{ProxyError, QuoteCacheProxy};

// Infrastructure config
pub use infrastructure::config::{
    ApiToken, CacheSettings, ConfigError, ProviderSettings, ProxyConfig, ServerSettings,
};

// Provider client
pub use infrastructure::provider::ProviderClient;

// HTTP server
pub use infrastructure::http::{AppState, ApiError, HttpServer, HttpServerError, create_router};

// Health
pub use infrastructure::health::{HealthState, HealthStatus, UpstreamStats};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
