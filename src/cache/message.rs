//! Generated-message cache with TTL expiry.
//!
//! [`MessageCache`] maps a [`CacheKey`] (canonical form of an
//! [`AttributeRecord`]) to the last message generated for it. It is built
//! once per process and shared by reference; every request handler sees the
//! same entries.
//!
//! # Expiry
//!
//! An entry is valid while `clock.now() - created_at < ttl`. Validity is
//! checked on every lookup against the injected [`Clock`]. A lookup never
//! removes anything, so it cannot race a concurrent store. The backing moka
//! cache is bounded by `max_entries` and carries the same TTL, which is what
//! reclaims memory for expired entries.
//!
//! # Concurrency
//!
//! Lookups and stores for different keys never interfere. There is no
//! per-key generation lock: two concurrent misses for the same key both
//! generate, and the last [`store`](MessageCache::store) wins.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use crate::telemetry;
use crate::types::AttributeRecord;

/// Configuration for the message cache.
///
/// ```rust
/// # use headliner::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 10,000.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a new config with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Canonical cache key for an [`AttributeRecord`].
///
/// Present attributes are rendered in canonical order as
/// `utm_key=<json string>` joined by `&`; absent attributes contribute
/// nothing. JSON string quoting makes the encoding injective, so records
/// that differ in any value or presence never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_record(record: &AttributeRecord) -> Self {
        let canonical = record
            .present()
            .map(|(attr, value)| {
                format!("{}={}", attr.query_key(), serde_json::Value::from(value))
            })
            .collect::<Vec<_>>()
            .join("&");
        Self(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&AttributeRecord> for CacheKey {
    fn from(record: &AttributeRecord) -> Self {
        Self::from_record(record)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored message and the instant it was stored.
///
/// Entries are immutable; an update replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub message: Arc<str>,
    pub created_at: Instant,
}

/// In-memory TTL cache of generated messages.
pub struct MessageCache {
    entries: Cache<CacheKey, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MessageCache {
    /// Create a cache on the system clock.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache that measures expiry on `clock`.
    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self {
            entries,
            ttl: config.ttl,
            clock,
        }
    }

    /// Look up a live message.
    ///
    /// Returns `None` on a miss or when the entry has expired. Expired
    /// entries are not removed here; the next store replaces them and moka's
    /// own TTL reclaims the rest. Emits cache hit/miss metrics.
    pub fn lookup(&self, key: &CacheKey) -> Option<String> {
        let hit = self.entries.get(key).and_then(|entry| {
            if self.clock.now().saturating_duration_since(entry.created_at) < self.ttl {
                Some(entry.message.to_string())
            } else {
                // left in place: a concurrent store may already have replaced it
                debug!(%key, "cached message expired");
                None
            }
        });
        match hit {
            Some(message) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(message)
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Store a message, replacing any previous entry and resetting its age.
    pub fn store(&self, key: CacheKey, message: impl Into<Arc<str>>) {
        let entry = CacheEntry {
            message: message.into(),
            created_at: self.clock.now(),
        };
        self.entries.insert(key, entry);
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Approximate number of entries, including not-yet-evicted expired ones.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for MessageCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}
