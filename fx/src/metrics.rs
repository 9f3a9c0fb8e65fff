//! Counters describing how requests were answered.

use std::sync::atomic::{AtomicU64, Ordering};

/// Engine metrics.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Requests answered from a fresh cache entry.
    pub cache_hits: AtomicU64,
    /// Requests that found no fresh cache entry.
    pub cache_misses: AtomicU64,
    /// Requests answered from a stale entry after a provider failure.
    pub stale_served: AtomicU64,
    /// Upstream fetch attempts.
    pub provider_fetches: AtomicU64,
    /// Upstream fetch attempts that failed or timed out.
    pub provider_failures: AtomicU64,
    /// Results computed from the fallback table alone.
    pub fallback_computations: AtomicU64,
}

impl EngineMetrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale_served(&self) {
        self.stale_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn provider_fetch(&self) {
        self.provider_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fallback_computation(&self) {
        self.fallback_computations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
            provider_fetches: self.provider_fetches.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            fallback_computations: self.fallback_computations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub stale_served: u64,
    pub provider_fetches: u64,
    pub provider_failures: u64,
    pub fallback_computations: u64,
}

impl MetricsSnapshot {
    /// Fraction of fetch attempts that failed.
    pub fn provider_failure_rate(&self) -> f64 {
        if self.provider_fetches == 0 {
            return 0.0;
        }
        self.provider_failures as f64 / self.provider_fetches as f64
    }
}
