//! Configuration Module
//!
//! Configuration loading for the proxy service.

mod settings;

pub use settings::{
    ApiToken, CacheSettings, ConfigError, ProviderSettings, ProxyConfig, ServerSettings,
};
