//! Cacheable Chart Responses
//!
//! Every upstream payload is reduced to a canonical byte form and hashed.
//! The hash is the response validator: HTTP caches compare it (as an
//! `ETag`) to decide whether a stored response can be reused.
//!
//! # Invariants
//!
//! - The validator is a function of the payload bytes only. The same bytes
//!   always produce the same validator, regardless of request, time or
//!   process.
//! - A `CachedQuoteResponse` is immutable once built.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Freshness window applied when none is configured: 10 × 100 000 ms.
pub const DEFAULT_FRESH_FOR: Duration = Duration::from_millis(10 * 100_000);

// =============================================================================
// Validator
// =============================================================================

/// Content-derived cache validator (hex-encoded BLAKE3 digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Validator(String);

impl Validator {
    /// Compute the validator for payload bytes.
    #[must_use]
    pub fn for_payload(payload: &[u8]) -> Self {
        Self(blake3::hash(payload).to_hex().to_string())
    }

    /// The bare digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strong entity tag form, quoted as required for the `ETag` header.
    #[must_use]
    pub fn to_etag(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Check an `If-None-Match` header value against this validator.
    ///
    /// Uses weak comparison: `W/` prefixes are ignored, `*` matches any
    /// validator, and a comma-separated list matches if any entry does.
    #[must_use]
    pub fn matches_if_none_match(&self, header: &str) -> bool {
        header.split(',').map(str::trim).any(|tag| {
            if tag == "*" {
                return true;
            }
            let tag = tag.strip_prefix("W/").unwrap_or(tag);
            tag.trim_matches('"') == self.0
        })
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Re-encode a JSON payload in canonical form.
///
/// Insignificant whitespace is dropped and object keys come out sorted, so
/// two payloads that differ only in formatting share one validator.
/// Numbers keep their exact textual form.
///
/// # Errors
///
/// Returns the parse error if `raw` is not valid JSON.
pub fn canonicalize(raw: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_slice(raw)?;
    serde_json::to_vec(&sort_keys(value))
}

// Map ordering depends on serde_json features enabled elsewhere in the
// build, so keys are sorted explicitly.
fn sort_keys(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

// =============================================================================
// Cached Quote Response
// =============================================================================

/// A chart payload tagged with its validator and freshness window.
#[derive(Debug, Clone)]
pub struct CachedQuoteResponse {
    payload: Vec<u8>,
    validator: Validator,
    generated_at: DateTime<Utc>,
    fresh_for: Duration,
}

impl CachedQuoteResponse {
    /// Wrap canonical payload bytes, computing their validator.
    #[must_use]
    pub fn new(payload: Vec<u8>, fresh_for: Duration) -> Self {
        Self::generated_at(payload, fresh_for, Utc::now())
    }

    /// Wrap canonical payload bytes with an explicit generation time.
    #[must_use]
    pub fn generated_at(payload: Vec<u8>, fresh_for: Duration, generated_at: DateTime<Utc>) -> Self {
        let validator = Validator::for_payload(&payload);
        Self {
            payload,
            validator,
            generated_at,
            fresh_for,
        }
    }

    /// Canonical payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the response, returning the payload bytes.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Content-derived validator.
    #[must_use]
    pub const fn validator(&self) -> &Validator {
        &self.validator
    }

    /// When the upstream payload was fetched.
    #[must_use]
    pub const fn generated_at_time(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// How long caches may reuse the response without revalidating.
    #[must_use]
    pub const fn fresh_for(&self) -> Duration {
        self.fresh_for
    }

    /// `Cache-Control` value: private to the requesting client, with a
    /// whole-second `max-age`.
    #[must_use]
    pub fn cache_control(&self) -> String {
        format!("private, max-age={}", self.fresh_for.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fresh_for_is_one_million_millis() {
        assert_eq!(DEFAULT_FRESH_FOR, Duration::from_millis(1_000_000));
    }

    #[test]
    fn same_bytes_same_validator() {
        let payload = br#"{"prices":[1,2,3]}"#;
        assert_eq!(
            Validator::for_payload(payload),
            Validator::for_payload(payload)
        );
    }

    #[test]
    fn different_bytes_different_validator() {
        assert_ne!(
            Validator::for_payload(br#"{"prices":[1,2,3]}"#),
            Validator::for_payload(br#"{"prices":[1,2,4]}"#)
        );
    }

    #[test]
    fn validator_is_hex_digest() {
        let validator = Validator::for_payload(b"");
        assert_eq!(validator.as_str().len(), 64);
        assert!(validator.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(validator.to_etag(), format!("\"{validator}\""));
    }

    #[test]
    fn if_none_match_comparison() {
        let validator = Validator::for_payload(b"chart");
        let etag = validator.to_etag();

        assert!(validator.matches_if_none_match(&etag));
        assert!(validator.matches_if_none_match(&format!("W/{etag}")));
        assert!(validator.matches_if_none_match(&format!("\"stale\", {etag}")));
        assert!(validator.matches_if_none_match("*"));
        assert!(!validator.matches_if_none_match("\"stale\""));
        assert!(!validator.matches_if_none_match(""));
    }

    #[test]
    fn canonical_form_ignores_formatting_and_key_order() {
        let compact = canonicalize(br#"{"b":1,"a":[1,2]}"#).unwrap();
        let spaced = canonicalize(b"{ \"a\" : [1, 2],\n \"b\" : 1 }").unwrap();
        assert_eq!(compact, spaced);
        assert_eq!(compact, br#"{"a":[1,2],"b":1}"#);
    }

    #[test]
    fn canonicalize_keeps_numbers_exact() {
        let raw = br#"[1175.4621790330661,18446744073709551617,1e2,0.1]"#;
        assert_eq!(canonicalize(raw).unwrap(), raw);
    }

    #[test]
    fn canonicalize_keeps_float_value() {
        let canonical = canonicalize(br#"{"close":1175.4621790330661}"#).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&canonical).unwrap();
        assert_eq!(value["close"].as_f64(), Some(1175.462_179_033_066_1));
    }

    #[test]
    fn canonicalize_rejects_malformed_json() {
        assert!(canonicalize(b"<html>gateway</html>").is_err());
    }

    #[test]
    fn response_carries_validator_of_its_payload() {
        let payload = br#"{"prices":[1,2,3]}"#.to_vec();
        let response = CachedQuoteResponse::new(payload.clone(), DEFAULT_FRESH_FOR);

        assert_eq!(response.payload(), payload.as_slice());
        assert_eq!(response.validator(), &Validator::for_payload(&payload));
        assert_eq!(response.cache_control(), "private, max-age=1000");
    }
}
