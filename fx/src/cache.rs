//! In-memory rate caching with lazy TTL expiry.

use chrono::Duration;
use dashmap::DashMap;
use ratekeeper_common::{age_of, constants, now, Timestamp};
use tracing::debug;

use crate::RateTable;

/// Cached value with the time it was written.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    written_at: Timestamp,
}

/// Result of a cache read.
#[derive(Debug, Clone)]
pub struct CachedValue<T> {
    pub value: T,
    pub written_at: Timestamp,
    pub age: Duration,
    /// Whether `age` is still inside the cache TTL.
    pub fresh: bool,
}

/// Thread-safe cache whose entries go stale after a fixed TTL.
///
/// Staleness is only evaluated on read. Nothing is ever evicted: a stale
/// entry stays until the next write for its key overwrites it.
pub struct RateCache<T> {
    entries: DashMap<String, CacheEntry<T>>,
    ttl: Duration,
    name: &'static str,
}

/// Pair cache: `FROM_TO` to a single rate.
pub type PairCache = RateCache<f64>;

/// Table cache: base currency to its full rate table.
pub type TableCache = RateCache<RateTable>;

impl<T: Clone> RateCache<T> {
    /// Create a cache with the standard 10 minute TTL.
    pub fn new(name: &'static str) -> Self {
        Self::with_ttl(name, constants::rate_cache_ttl())
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(name: &'static str, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            name,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Read an entry, fresh or stale.
    pub fn get(&self, key: &str) -> Option<CachedValue<T>> {
        let entry = self.entries.get(key)?;
        let age = age_of(entry.written_at);
        let fresh = age < self.ttl;

        debug!(
            cache = self.name,
            key,
            age_ms = age.num_milliseconds(),
            fresh,
            "Cache hit"
        );

        Some(CachedValue {
            value: entry.value.clone(),
            written_at: entry.written_at,
            age,
            fresh,
        })
    }

    /// Read an entry only if it is still fresh.
    pub fn get_fresh(&self, key: &str) -> Option<CachedValue<T>> {
        self.get(key).filter(|hit| hit.fresh)
    }

    /// Overwrite the entry for `key`.
    pub fn put(&self, key: impl Into<String>, value: T, written_at: Timestamp) {
        self.entries.insert(key.into(), CacheEntry { value, written_at });
    }

    /// Write a value fetched just now. Returns its timestamp.
    pub fn put_fresh(&self, key: impl Into<String>, value: T) -> Timestamp {
        let written_at = now();
        self.put(key, value, written_at);
        written_at
    }

    /// Write a value derived only from fallback data.
    ///
    /// The entry is backdated by half the TTL so the live provider is tried
    /// again after half the usual window. Returns the backdated timestamp.
    pub fn put_fallback(&self, key: impl Into<String>, value: T) -> Timestamp {
        let written_at = now() - self.ttl / 2;
        self.put(key, value, written_at);
        written_at
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Get the number of entries in cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (fresh, stale) = self.entries.iter().fold((0, 0), |(fresh, stale), e| {
            if age_of(e.written_at) < self.ttl {
                (fresh + 1, stale)
            } else {
                (fresh, stale + 1)
            }
        });

        CacheStats {
            total_entries: fresh + stale,
            fresh_entries: fresh,
            stale_entries: stale,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub stale_entries: usize,
}
