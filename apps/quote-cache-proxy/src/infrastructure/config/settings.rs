//! Proxy Configuration Settings
//!
//! Configuration types for the quote cache proxy, loaded from environment
//! variables.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::domain::cache::DEFAULT_FRESH_FOR;

/// Default provider base URL.
const DEFAULT_PROVIDER_URL: &str = "https://sandbox.iexapis.com";

/// Quote provider API token.
#[derive(Clone)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a token.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// Get the token for use in an outbound request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken([REDACTED])")
    }
}

/// Upstream provider settings.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Provider base URL, without trailing slash.
    pub base_url: String,
    /// API token appended to every request.
    pub token: ApiToken,
    /// Bound on each outbound request.
    pub timeout: Duration,
}

impl ProviderSettings {
    /// Default outbound request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create settings with the default timeout.
    #[must_use]
    pub fn new(base_url: &str, token: ApiToken) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Bind address.
    pub host: IpAddr,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3333,
        }
    }
}

impl ServerSettings {
    /// Socket address to bind.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Cache policy settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Freshness window advertised through `Cache-Control: max-age`.
    pub fresh_for: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            fresh_for: DEFAULT_FRESH_FOR,
        }
    }
}

/// Complete proxy configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Upstream provider settings.
    pub provider: ProviderSettings,
    /// HTTP listener settings.
    pub server: ServerSettings,
    /// Cache policy settings.
    pub cache: CacheSettings,
}

impl ProxyConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or
    /// the provider URL is not an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ProxyConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = lookup("QUOTE_PROVIDER_TOKEN")
            .ok_or_else(|| ConfigError::MissingEnvVar("QUOTE_PROVIDER_TOKEN".to_string()))?;

        if token.trim().is_empty() {
            return Err(ConfigError::EmptyValue("QUOTE_PROVIDER_TOKEN".to_string()));
        }

        let base_url =
            lookup("QUOTE_PROVIDER_URL").unwrap_or_else(|| DEFAULT_PROVIDER_URL.to_string());

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "QUOTE_PROVIDER_URL".to_string(),
                value: base_url,
            });
        }

        let mut provider = ProviderSettings::new(&base_url, ApiToken::new(token.trim().to_string()));
        provider.timeout = parse_duration_millis(
            &lookup,
            "QUOTE_PROXY_UPSTREAM_TIMEOUT_MS",
            ProviderSettings::DEFAULT_TIMEOUT,
        );

        let server = ServerSettings {
            host: parse_or(&lookup, "QUOTE_PROXY_HOST", ServerSettings::default().host),
            port: parse_or(&lookup, "QUOTE_PROXY_PORT", ServerSettings::default().port),
        };

        let cache = CacheSettings {
            fresh_for: parse_duration_millis(
                &lookup,
                "QUOTE_PROXY_FRESH_FOR_MS",
                CacheSettings::default().fresh_for,
            ),
        };

        Ok(Self {
            provider,
            server,
            cache,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has an unusable value.
    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
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
