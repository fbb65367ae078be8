//! Quote Proxy Client Tests
//!
//! Exercises caching, revalidation and retries against a mock proxy.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use quote_domain::{PeriodCode, QuoteRequest, Symbol};
use stock_picker::{ClientError, ClientSettings, QuoteProxyClient, ResponseSource, RetryPolicy};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHART: &str = r#"[{"date":"2024-01-02","close":185.64}]"#;

fn aapl_1m() -> QuoteRequest {
    QuoteRequest::new(Symbol::parse("AAPL").unwrap(), PeriodCode::OneMonth)
}

fn client_for(server: &MockServer) -> QuoteProxyClient {
    let mut settings = ClientSettings::new(&server.uri());
    settings.timeout = Duration::from_secs(2);
    settings.retry = RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        multiplier: 2.0,
        jitter_factor: 0.0,
    };
    QuoteProxyClient::new(&settings).unwrap()
}

fn chart_response(cache_control: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("etag", "\"abc123\"")
        .insert_header("cache-control", cache_control)
        .set_body_raw(CHART, "application/json")
}

#[tokio::test]
async fn test_fresh_entry_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote/AAPL/chart/1m"))
        .respond_with(chart_response("public, max-age=3600"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let first = client.get_chart(&aapl_1m()).await.unwrap();
    let second = client.get_chart(&aapl_1m()).await.unwrap();

    assert_eq!(first.source, ResponseSource::Network);
    assert_eq!(first.etag.as_deref(), Some("\"abc123\""));
    assert_eq!(second.source, ResponseSource::Cache);
    assert_eq!(second.body, CHART.as_bytes());
}

#[tokio::test]
async fn test_stale_entry_revalidates_with_etag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote/AAPL/chart/1m"))
        .and(header("if-none-match", "\"abc123\""))
        .respond_with(
            ResponseTemplate::new(304)
                .insert_header("etag", "\"abc123\"")
                .insert_header("cache-control", "public, max-age=0"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quote/AAPL/chart/1m"))
        .respond_with(chart_response("public, max-age=0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let first = client.get_chart(&aapl_1m()).await.unwrap();
    let second = client.get_chart(&aapl_1m()).await.unwrap();

    assert_eq!(first.source, ResponseSource::Network);
    assert_eq!(second.source, ResponseSource::Revalidated);
    assert_eq!(second.body, first.body);
}

#[tokio::test]
async fn test_unavailable_proxy_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote/AAPL/chart/1m"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quote/AAPL/chart/1m"))
        .respond_with(chart_response("public, max-age=60"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client.get_chart(&aapl_1m()).await.unwrap();

    assert_eq!(response.source, ResponseSource::Network);
    assert_eq!(response.body, CHART.as_bytes());
}

#[tokio::test]
async fn test_retries_give_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_chart(&aapl_1m()).await.unwrap_err();

    assert!(matches!(err, ClientError::Unavailable { attempts: 3, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote/AAPL/chart/1m"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_request",
            "message": "unsupported period"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/quote/AAPL/chart/3m"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": "upstream_rejected",
            "message": "Unknown symbol"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);

    let invalid = client.get_chart(&aapl_1m()).await.unwrap_err();
    assert_eq!(
        invalid,
        ClientError::InvalidRequest("unsupported period".to_string())
    );

    let three_months = QuoteRequest::new(Symbol::parse("AAPL").unwrap(), PeriodCode::ThreeMonths);
    let rejected = client.get_chart(&three_months).await.unwrap_err();
    assert_eq!(
        rejected,
        ClientError::Rejected {
            status: 404,
            message: "Unknown symbol".to_string()
        }
    );
    assert!(!rejected.is_retryable());
}

#[tokio::test]
async fn test_no_store_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote/AAPL/chart/1m"))
        .respond_with(chart_response("no-store"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get_chart(&aapl_1m()).await.unwrap();
    let second = client.get_chart(&aapl_1m()).await.unwrap();

    assert_eq!(second.source, ResponseSource::Network);
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn test_cache_stays_within_capacity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(chart_response("private, max-age=3600"))
        .mount(&server)
        .await;

    let mut settings = ClientSettings::new(&server.uri());
    settings.cache_capacity = 2;
    let client = QuoteProxyClient::new(&settings).unwrap();

    for symbol in ["AAPL", "MSFT", "GOOG", "TSLA"] {
        let request = QuoteRequest::new(Symbol::parse(symbol).unwrap(), PeriodCode::OneYear);
        client.get_chart(&request).await.unwrap();
    }

    assert_eq!(client.cache().len(), 2);
}
