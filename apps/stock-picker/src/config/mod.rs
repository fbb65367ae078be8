//! Picker Configuration
//!
//! Loaded from environment variables:
//!
//! - `STOCK_PICKER_PROXY_URL`: Quote proxy base URL (default: <http://localhost:3333>)
//! - `STOCK_PICKER_MODE`: `range` | `period` (default: range)
//! - `STOCK_PICKER_DEBOUNCE_MS`: Symbol quiet window (default: 300)
//! - `STOCK_PICKER_TIMEOUT_MS`: Per-attempt HTTP timeout (default: 10000)
//! - `STOCK_PICKER_DEDUPE`: Collapse consecutive identical requests (default: false)
//! - `STOCK_PICKER_CACHE_CAPACITY`: Charts kept for revalidation (default: 128)

use std::time::Duration;

use crate::client::ClientSettings;
use crate::orchestrator::{DEFAULT_SYMBOL_DEBOUNCE, InputMode, OrchestratorSettings};

const DEFAULT_PROXY_URL: &str = "http://localhost:3333";

/// Complete picker configuration.
#[derive(Debug, Clone)]
pub struct PickerConfig {
    /// Proxy client settings.
    pub client: ClientSettings,
    /// Orchestrator settings.
    pub orchestrator: OrchestratorSettings,
}

impl PickerConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the proxy URL is not http(s) or the mode is unknown.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`PickerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let proxy_url =
            lookup("STOCK_PICKER_PROXY_URL").unwrap_or_else(|| DEFAULT_PROXY_URL.to_string());

        if !(proxy_url.starts_with("http://") || proxy_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "STOCK_PICKER_PROXY_URL".to_string(),
                value: proxy_url,
            });
        }

        let mode = match lookup("STOCK_PICKER_MODE") {
            Some(raw) => raw.parse::<InputMode>().map_err(|_| ConfigError::InvalidValue {
                key: "STOCK_PICKER_MODE".to_string(),
                value: raw,
            })?,
            None => InputMode::default(),
        };

        let mut client = ClientSettings::new(&proxy_url);
        client.timeout = parse_duration_millis(
            &lookup,
            "STOCK_PICKER_TIMEOUT_MS",
            ClientSettings::DEFAULT_TIMEOUT,
        );
        if let Some(capacity) =
            lookup("STOCK_PICKER_CACHE_CAPACITY").and_then(|v| v.trim().parse::<usize>().ok())
        {
            client.cache_capacity = capacity;
        }

        let orchestrator = OrchestratorSettings {
            mode,
            symbol_debounce: parse_duration_millis(
                &lookup,
                "STOCK_PICKER_DEBOUNCE_MS",
                DEFAULT_SYMBOL_DEBOUNCE,
            ),
            dedupe_requests: lookup("STOCK_PICKER_DEDUPE")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
        };

        Ok(Self {
            client,
            orchestrator,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has an unusable value.
    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
}

fn parse_duration_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
