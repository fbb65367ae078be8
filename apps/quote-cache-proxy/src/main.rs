//! Quote Cache Proxy Binary
//!
//! Starts the chart proxy.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin quote-cache-proxy
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `QUOTE_PROVIDER_TOKEN`: Provider API token
//!
//! ## Optional
//! - `QUOTE_PROVIDER_URL`: Provider base URL (default: <https://sandbox.iexapis.com>)
//! - `QUOTE_PROXY_HOST`: Bind address (default: 127.0.0.1)
//! - `QUOTE_PROXY_PORT`: Bind port (default: 3333)
//! - `QUOTE_PROXY_UPSTREAM_TIMEOUT_MS`: Upstream request bound (default: 10000)
//! - `QUOTE_PROXY_FRESH_FOR_MS`: Advertised freshness window (default: 1000000)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use quote_cache_proxy::infrastructure::telemetry;
use quote_cache_proxy::{
    AppState, HttpServer, ProviderClient, ProxyConfig, QuoteCacheProxy, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Quote Cache Proxy");

    let _metrics_handle = init_metrics();

    let config = ProxyConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
    })?;
    log_config(&config);

    let provider = ProviderClient::new(&config.provider)?;
    let proxy = QuoteCacheProxy::new(Arc::new(provider), config.cache.fresh_for);
    let state = AppState::new(proxy, env!("CARGO_PKG_VERSION").to_string());

    let shutdown_token = CancellationToken::new();
    let server = HttpServer::new(config.server.socket_addr(), state, shutdown_token.clone());

    let mut server_task = tokio::spawn(server.run());

    tokio::select! {
        joined = &mut server_task => {
            // The server only returns on its own if it failed.
            shutdown_token.cancel();
            joined??;
            return Ok(());
        }
        () = await_shutdown(shutdown_token.clone()) => {}
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server_task).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!("Shutdown timed out with requests in flight"),
    }

    tracing::info!("Quote proxy stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &ProxyConfig) {
    tracing::info!(
        addr = %config.server.socket_addr(),
        provider = %config.provider.base_url,
        upstream_timeout = ?config.provider.timeout,
        fresh_for_secs = config.cache.fresh_for.as_secs(),
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
