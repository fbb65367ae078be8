//! Quote Proxy Client
//!
//! reqwest client for the quote cache proxy with a revalidating cache.
//!
//! # Caching
//!
//! - A fresh entry is served with no network call.
//! - A stale entry is revalidated with `If-None-Match`; a `304` refreshes its
//!   freshness from the new `Cache-Control: max-age` and serves the cached
//!   body.
//! - `no-store` responses evict instead of caching.
//!
//! # Retries
//!
//! Network errors and `502`/`503`/`504` are retried with exponential backoff
//! and jitter (see [`RetryPolicy`]). Other statuses are final.

mod cache;
mod retry;

use std::time::{Duration, Instant};

use quote_domain::QuoteRequest;
use reqwest::header::{CACHE_CONTROL, ETAG, HeaderMap, IF_NONE_MATCH};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

pub use cache::{CacheEntry, CachePolicy, RevalidationCache};
pub use retry::{Backoff, RetryPolicy};

/// Settings for [`QuoteProxyClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Proxy base URL, without trailing slash.
    pub base_url: String,
    /// Bound on each HTTP attempt.
    pub timeout: Duration,
    /// Retry behaviour.
    pub retry: RetryPolicy,
    /// Maximum number of charts kept for revalidation.
    pub cache_capacity: usize,
}

impl ClientSettings {
    /// Default per-attempt timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create settings with default timeout and retries.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            cache_capacity: RevalidationCache::DEFAULT_CAPACITY,
        }
    }
}

/// Where a chart body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Full response from the proxy.
    Network,
    /// Fresh cache entry, no request made.
    Cache,
    /// Cache entry confirmed by a `304`.
    Revalidated,
}

/// A chart body and its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartResponse {
    /// Chart payload (JSON).
    pub body: Vec<u8>,
    /// Entity tag, if the proxy sent one.
    pub etag: Option<String>,
    /// Where the body came from.
    pub source: ResponseSource,
}

/// Client errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Proxy rejected the symbol or period.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Proxy passed through a provider 4xx.
    #[error("request rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Proxy unreachable or failing.
    #[error("proxy unavailable after {attempts} attempt(s): {reason}")]
    Unavailable {
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        reason: String,
    },

    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl ClientError {
    /// Whether a later retry may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for the quote cache proxy.
#[derive(Debug)]
pub struct QuoteProxyClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
    cache: RevalidationCache,
}

impl QuoteProxyClient {
    /// Create a client from settings.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Build` if the HTTP client cannot be built.
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            retry: settings.retry.clone(),
            cache: RevalidationCache::with_capacity(settings.cache_capacity),
        })
    }

    /// Proxy URL for a chart.
    #[must_use]
    pub fn chart_url(&self, request: &QuoteRequest) -> String {
        format!("{}/quote/{}", self.base_url, request.chart_path())
    }

    /// Cached charts.
    #[must_use]
    pub const fn cache(&self) -> &RevalidationCache {
        &self.cache
    }

    /// Fetch a chart, using or revalidating the cache where possible.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for 400, `Rejected` for other 4xx, `Unavailable`
    /// once retries are exhausted or for non-retryable 5xx.
    pub async fn get_chart(&self, request: &QuoteRequest) -> Result<ChartResponse, ClientError> {
        let cached = self.cache.get(request);

        if let Some(entry) = &cached
            && entry.is_fresh(Instant::now())
        {
            tracing::debug!(request = %request, "Serving fresh cached chart");
            return Ok(ChartResponse {
                body: entry.body.clone(),
                etag: entry.etag.clone(),
                source: ResponseSource::Cache,
            });
        }

        let validator = cached.and_then(|entry| entry.etag);
        let (response, attempts) = self.send(request, validator.as_deref()).await?;

        let status = response.status();
        let etag = header_value(response.headers(), ETAG);
        let policy = header_value(response.headers(), CACHE_CONTROL)
            .map(|v| CachePolicy::parse(&v))
            .unwrap_or_default();

        if status == StatusCode::NOT_MODIFIED {
            let fresh_until = Instant::now() + policy.freshness();
            return match self.cache.refresh(request, fresh_until, etag) {
                Some(entry) => {
                    tracing::debug!(request = %request, "Cached chart revalidated");
                    Ok(ChartResponse {
                        body: entry.body,
                        etag: entry.etag,
                        source: ResponseSource::Revalidated,
                    })
                }
                None => Err(ClientError::Unavailable {
                    attempts,
                    reason: "not modified, but nothing cached".to_string(),
                }),
            };
        }

        if status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| ClientError::Unavailable {
                    attempts,
                    reason: e.to_string(),
                })?
                .to_vec();

            if policy.no_store {
                self.cache.remove(request);
            } else {
                self.cache.insert(
                    request.clone(),
                    CacheEntry {
                        etag: etag.clone(),
                        body: body.clone(),
                        fresh_until: Instant::now() + policy.freshness(),
                    },
                );
            }

            tracing::debug!(request = %request, bytes = body.len(), "Chart fetched");
            return Ok(ChartResponse {
                body,
                etag,
                source: ResponseSource::Network,
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, &body, attempts))
    }

    /// Send with retries. Returns the final response and attempts made.
    async fn send(
        &self,
        request: &QuoteRequest,
        validator: Option<&str>,
    ) -> Result<(Response, u32), ClientError> {
        let url = self.chart_url(request);
        let mut backoff = self.retry.backoff();

        loop {
            let mut builder = self.client.get(&url);
            if let Some(tag) = validator {
                builder = builder.header(IF_NONE_MATCH, tag);
            }

            let failure = match builder.send().await {
                Ok(response) => match categorize_status(response.status()) {
                    ErrorCategory::Retryable => format!("proxy returned {}", response.status()),
                    ErrorCategory::Final => return Ok((response, backoff.attempts() + 1)),
                },
                Err(e) => e.to_string(),
            };

            if let Some(delay) = backoff.next_backoff() {
                tracing::warn!(
                    request = %request,
                    error = %failure,
                    delay_ms = delay.as_millis(),
                    attempt = backoff.attempts(),
                    "Proxy request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            } else {
                return Err(ClientError::Unavailable {
                    attempts: backoff.attempts(),
                    reason: failure,
                });
            }
        }
    }
}

/// Retry category of a proxy response status.
enum ErrorCategory {
    Retryable,
    Final,
}

const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        502..=504 => ErrorCategory::Retryable,
        _ => ErrorCategory::Final,
    }
}

fn error_for_status(status: StatusCode, body: &str, attempts: u32) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| body.to_string(), |e| e.message);

    match status.as_u16() {
        400 => ClientError::InvalidRequest(message),
        code @ 401..=499 => ClientError::Rejected {
            status: code,
            message,
        },
        _ => ClientError::Unavailable {
            attempts,
            reason: format!("proxy returned {status}: {message}"),
        },
    }
}

fn header_value(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
