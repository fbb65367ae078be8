//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the chart proxy service and the port it uses to
//! reach the upstream quote provider.

/// Port interfaces for external systems (upstream provider).
pub mod ports;

/// Application services (the quote cache proxy).
pub mod services;
