//! Main FX engine implementation.

use std::sync::Arc;

use chrono::Duration;
use ratekeeper_common::{constants, CurrencyCode, CurrencyPair, DurationExt};
use tracing::instrument;

use crate::cache::{CacheStats, PairCache, TableCache};
use crate::conversion::{Conversion, ConversionEngine, RateQuote};
use crate::error::FxResult;
use crate::fallback::FallbackRateTable;
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::provider::RateProvider;
use crate::rates::{RateTableService, RateTableSnapshot};
use crate::source::RateSource;

/// Configuration for the FX engine.
#[derive(Debug, Clone)]
pub struct FxEngineConfig {
    /// Freshness window for both caches.
    pub cache_ttl: Duration,
    /// Deadline for a single upstream fetch.
    pub provider_timeout: Duration,
    /// On provider failure, answer from an expired cache entry when one
    /// exists instead of recomputing from the fallback table.
    pub serve_stale_on_failure: bool,
}

impl Default for FxEngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: constants::rate_cache_ttl(),
            provider_timeout: constants::provider_timeout(),
            serve_stale_on_failure: false,
        }
    }
}

impl FxEngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ttl) = env_seconds("RATEKEEPER_CACHE_TTL_SECS") {
            config.cache_ttl = ttl;
        }

        if let Some(timeout) = env_seconds("RATEKEEPER_PROVIDER_TIMEOUT_SECS") {
            config.provider_timeout = timeout;
        }

        if let Ok(flag) = std::env::var("RATEKEEPER_SERVE_STALE") {
            config.serve_stale_on_failure = matches!(flag.as_str(), "1" | "true" | "yes");
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_ttl <= Duration::zero() {
            return Err("Cache TTL must be positive".to_string());
        }

        if self.provider_timeout <= Duration::zero() {
            return Err("Provider timeout must be positive".to_string());
        }

        Ok(())
    }
}

fn env_seconds(name: &str) -> Option<Duration> {
    std::env::var(name).ok().and_then(|raw| parse_seconds(&raw))
}

/// Parse a whole number of seconds. Values chrono cannot represent are
/// treated like unparseable ones.
fn parse_seconds(raw: &str) -> Option<Duration> {
    raw.trim().parse().ok().and_then(Duration::try_seconds)
}

/// The FX engine: pair conversions and rate tables over one provider.
///
/// Construct once and share behind an `Arc`; every instance owns its own
/// caches.
pub struct FxEngine {
    conversions: ConversionEngine,
    tables: RateTableService,
    metrics: Arc<EngineMetrics>,
}

impl FxEngine {
    /// Create a new FX engine with the built-in fallback table.
    pub fn new(provider: Arc<dyn RateProvider>, config: FxEngineConfig) -> Self {
        Self::with_fallback(provider, FallbackRateTable::standard(), config)
    }

    /// Create a new FX engine with a custom fallback table.
    pub fn with_fallback(
        provider: Arc<dyn RateProvider>,
        fallback: FallbackRateTable,
        config: FxEngineConfig,
    ) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let source = Arc::new(RateSource::new(
            provider,
            fallback,
            config.provider_timeout.as_std(),
            metrics.clone(),
        ));

        Self {
            conversions: ConversionEngine::new(
                source.clone(),
                PairCache::with_ttl("pair", config.cache_ttl),
                metrics.clone(),
                config.serve_stale_on_failure,
            ),
            tables: RateTableService::new(
                source,
                TableCache::with_ttl("table", config.cache_ttl),
                metrics.clone(),
                config.serve_stale_on_failure,
            ),
            metrics,
        }
    }

    /// Get the rate between two currencies. Codes are case-insensitive.
    pub async fn convert(&self, from: &str, to: &str) -> FxResult<RateQuote> {
        let pair = CurrencyPair::new(from, to);
        self.conversions.convert(&pair).await
    }

    /// Convert an amount between two currencies.
    #[instrument(skip(self))]
    pub async fn convert_amount(&self, from: &str, to: &str, amount: f64) -> FxResult<Conversion> {
        let quote = self.convert(from, to).await?;
        Ok(Conversion::new(&quote, amount))
    }

    /// Get the rate table for `base`, optionally narrowed to some currencies.
    pub async fn rates_for(
        &self,
        base: &str,
        filter: Option<&[CurrencyCode]>,
    ) -> FxResult<RateTableSnapshot> {
        self.tables.rates_for(&CurrencyCode::new(base), filter).await
    }

    pub fn conversions(&self) -> &ConversionEngine {
        &self.conversions
    }

    pub fn tables(&self) -> &RateTableService {
        &self.tables
    }

    /// Get engine statistics.
    pub fn stats(&self) -> FxEngineStats {
        FxEngineStats {
            metrics: self.metrics.snapshot(),
            pair_cache: self.conversions.cache().stats(),
            table_cache: self.tables.cache().stats(),
        }
    }
}

/// Engine statistics.
#[derive(Debug, Clone)]
pub struct FxEngineStats {
    pub metrics: MetricsSnapshot,
    pub pair_cache: CacheStats,
    pub table_cache: CacheStats,
}
