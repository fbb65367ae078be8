//! Revalidation cache.
//!
//! Entries are keyed by [`QuoteRequest`] and hold the last body, its entity
//! tag and the instant it stops being fresh. The cache is bounded: a stale
//! entry without a tag is dropped, and a full cache evicts the entry closest
//! to going stale.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use quote_domain::QuoteRequest;

/// Caching directives read from `Cache-Control`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    /// `max-age`, if present.
    pub max_age: Option<Duration>,
    /// `no-store` was present.
    pub no_store: bool,
}

impl CachePolicy {
    /// Parse a `Cache-Control` value. Unknown directives are ignored.
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let mut policy = Self::default();

        for directive in header.split(',').map(str::trim) {
            let lower = directive.to_ascii_lowercase();
            if lower == "no-store" {
                policy.no_store = true;
            } else if lower == "no-cache" {
                policy.max_age = Some(Duration::ZERO);
            } else if let Some(secs) = lower.strip_prefix("max-age=")
                && let Ok(secs) = secs.trim_matches('"').parse::<u64>()
            {
                policy.max_age = Some(Duration::from_secs(secs));
            }
        }

        policy
    }

    /// How long a response stays fresh. Absent `max-age` means stale at once.
    #[must_use]
    pub fn freshness(&self) -> Duration {
        self.max_age.unwrap_or(Duration::ZERO)
    }
}

/// One cached chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Entity tag to revalidate with.
    pub etag: Option<String>,
    /// Cached body.
    pub body: Vec<u8>,
    /// Instant the entry goes stale.
    pub fresh_until: Instant,
}

impl CacheEntry {
    /// Whether the entry may be served without contacting the proxy.
    #[must_use]
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.fresh_until
    }

    /// Whether the entry can still be served or revalidated.
    #[must_use]
    pub fn is_usable(&self, now: Instant) -> bool {
        self.etag.is_some() || self.is_fresh(now)
    }
}

/// Thread-safe, bounded chart cache.
#[derive(Debug)]
pub struct RevalidationCache {
    entries: RwLock<HashMap<QuoteRequest, CacheEntry>>,
    capacity: usize,
}

impl Default for RevalidationCache {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl RevalidationCache {
    /// Default maximum number of cached charts.
    pub const DEFAULT_CAPACITY: usize = 128;

    /// Create an empty cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache holding at most `capacity` charts (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Maximum number of cached charts.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy of the entry for a request.
    #[must_use]
    pub fn get(&self, request: &QuoteRequest) -> Option<CacheEntry> {
        self.entries.read().get(request).cloned()
    }

    /// Store or replace an entry.
    ///
    /// An entry that is already unusable replaces nothing and is not kept.
    /// When full, unusable entries are pruned first, then the entry with the
    /// earliest `fresh_until` is evicted.
    pub fn insert(&self, request: QuoteRequest, entry: CacheEntry) {
        let now = Instant::now();
        let mut entries = self.entries.write();

        if !entry.is_usable(now) {
            entries.remove(&request);
            return;
        }

        if !entries.contains_key(&request) && entries.len() >= self.capacity {
            entries.retain(|_, e| e.is_usable(now));

            if entries.len() >= self.capacity
                && let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.fresh_until)
                    .map(|(k, _)| k.clone())
            {
                tracing::debug!(request = %oldest, "Evicting cached chart");
                entries.remove(&oldest);
            }
        }

        entries.insert(request, entry);
    }

    /// Extend an entry's freshness after a successful revalidation.
    ///
    /// Returns the refreshed entry, or `None` if it was evicted meanwhile.
    pub fn refresh(
        &self,
        request: &QuoteRequest,
        fresh_until: Instant,
        etag: Option<String>,
    ) -> Option<CacheEntry> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(request)?;
        entry.fresh_until = fresh_until;
        if etag.is_some() {
            entry.etag = etag;
        }
        Some(entry.clone())
    }

    /// Drop the entry for a request.
    pub fn remove(&self, request: &QuoteRequest) {
        self.entries.write().remove(request);
    }

    /// Number of cached charts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
