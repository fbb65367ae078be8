//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, and the HTTP surface of the proxy.

/// Upstream quote provider HTTP client.
pub mod provider;

/// Chart HTTP server (axum).
pub mod http;

/// Configuration loading.
pub mod config;

/// Health check endpoints.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;
