//! Quote Provider Client
//!
//! reqwest-backed implementation of [`UpstreamPort`]. Each chart fetch is a
//! single bounded GET:
//!
//! ```text
//! GET {base_url}/beta/stock/{symbol}/chart/{period}?token={token}
//! ```
//!
//! The token is attached as a query parameter at send time and is stripped
//! from every error before it can reach a log line.

use std::time::Duration;

use async_trait::async_trait;
use quote_domain::QuoteRequest;
use reqwest::Client;

use crate::application::ports::{UpstreamError, UpstreamPort};
use crate::infrastructure::config::{ApiToken, ProviderSettings};

/// Longest upstream error body kept in an error.
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the upstream quote provider.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    client: Client,
    base_url: String,
    token: ApiToken,
    timeout: Duration,
}

impl ProviderClient {
    /// Create a new provider client from settings.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError::Network` if the HTTP client cannot be built.
    pub fn new(settings: &ProviderSettings) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| UpstreamError::Network(e.without_url().to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            timeout: settings.timeout,
        })
    }

    /// Upstream URL for a chart, without credentials.
    #[must_use]
    pub fn chart_url(&self, request: &QuoteRequest) -> String {
        format!("{}/beta/stock/{}", self.base_url, request.chart_path())
    }

    fn classify(&self, err: reqwest::Error) -> UpstreamError {
        if err.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::Network(err.without_url().to_string())
        }
    }
}

#[async_trait]
impl UpstreamPort for ProviderClient {
    async fn get_chart(&self, request: &QuoteRequest) -> Result<Vec<u8>, UpstreamError> {
        let url = self.chart_url(request);
        tracing::debug!(url = %url, "Requesting chart from provider");

        let response = self
            .client
            .get(&url)
            .query(&[("token", self.token.expose())])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();

        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_at_char_boundary(&mut body, MAX_ERROR_BODY);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        Ok(bytes.to_vec())
    }
}

fn truncate_at_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}
