//! Pair conversions through the USD pivot.

use std::sync::Arc;

use ratekeeper_common::{now, CurrencyCode, CurrencyPair, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CachedValue, PairCache};
use crate::error::{FxError, FxResult};
use crate::metrics::EngineMetrics;
use crate::source::RateSource;
use crate::RateTable;

/// Where a quoted rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateOrigin {
    /// Same currency on both sides.
    Identity,
    /// Computed from a live upstream table.
    Live,
    /// Computed from the fallback table alone.
    Fallback,
    /// Served from the pair cache.
    Cached,
    /// Served from an expired cache entry because the upstream failed.
    Stale,
}

/// Rate between two currencies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: f64,
    pub last_updated: Timestamp,
    #[serde(skip)]
    pub origin: RateOrigin,
}

impl RateQuote {
    fn new(pair: &CurrencyPair, rate: f64, last_updated: Timestamp, origin: RateOrigin) -> Self {
        Self {
            from: pair.from.clone(),
            to: pair.to.clone(),
            rate,
            last_updated,
            origin,
        }
    }

    fn from_cache(pair: &CurrencyPair, hit: CachedValue<f64>, origin: RateOrigin) -> Self {
        Self::new(pair, hit.value, hit.written_at, origin)
    }
}

/// Represents a completed conversion of an amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub amount: f64,
    pub converted_amount: f64,
    pub rate: f64,
    pub last_updated: Timestamp,
}

impl Conversion {
    /// Apply a quote to an amount.
    pub fn new(quote: &RateQuote, amount: f64) -> Self {
        Self {
            from: quote.from.clone(),
            to: quote.to.clone(),
            amount,
            converted_amount: amount * quote.rate,
            rate: quote.rate,
            last_updated: quote.last_updated,
        }
    }
}

/// Cross rate from two USD-denominated rates.
pub fn cross_rate(from: &CurrencyCode, to: &CurrencyCode, usd_from: f64, usd_to: f64) -> f64 {
    if from.is_pivot() {
        usd_to
    } else if to.is_pivot() {
        1.0 / usd_from
    } else {
        usd_to / usd_from
    }
}

fn is_usable(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// Answers single-pair rate requests, caching each pair.
pub struct ConversionEngine {
    source: Arc<RateSource>,
    cache: PairCache,
    metrics: Arc<EngineMetrics>,
    serve_stale_on_failure: bool,
}

impl ConversionEngine {
    pub fn new(
        source: Arc<RateSource>,
        cache: PairCache,
        metrics: Arc<EngineMetrics>,
        serve_stale_on_failure: bool,
    ) -> Self {
        Self {
            source,
            cache,
            metrics,
            serve_stale_on_failure,
        }
    }

    pub fn cache(&self) -> &PairCache {
        &self.cache
    }

    /// Get the rate from `pair.from` to `pair.to`.
    ///
    /// Provider failures are never returned; they degrade to fallback data.
    #[instrument(skip(self), fields(pair = %pair))]
    pub async fn convert(&self, pair: &CurrencyPair) -> FxResult<RateQuote> {
        if pair.is_identity() {
            return Ok(RateQuote::new(pair, 1.0, now(), RateOrigin::Identity));
        }

        let key = pair.cache_key();
        let cached = self.cache.get(&key);
        if let Some(hit) = cached.as_ref().filter(|hit| hit.fresh) {
            debug!("Using cached rate");
            self.metrics.cache_hit();
            return Ok(RateQuote::from_cache(pair, hit.clone(), RateOrigin::Cached));
        }
        self.metrics.cache_miss();

        match self.source.fetch_usd_table().await {
            Ok(live) => {
                let rate = self.blended_rate(pair, Some(&live));
                if is_usable(rate) {
                    let written_at = self.cache.put_fresh(key, rate);
                    info!(rate, "Rate computed from live data");
                    return Ok(RateQuote::new(pair, rate, written_at, RateOrigin::Live));
                }
                warn!(rate, "Live data produced an unusable rate, recomputing from fallback");
            }
            Err(_) => {
                if let Some(stale) = cached.filter(|_| self.serve_stale_on_failure) {
                    self.metrics.stale_served();
                    warn!(age_secs = stale.age.num_seconds(), "Serving stale cached rate");
                    return Ok(RateQuote::from_cache(pair, stale, RateOrigin::Stale));
                }
            }
        }

        self.convert_from_fallback(pair, key)
    }

    fn convert_from_fallback(&self, pair: &CurrencyPair, key: String) -> FxResult<RateQuote> {
        self.metrics.fallback_computation();

        let rate = self.blended_rate(pair, None);
        if !is_usable(rate) {
            return Err(FxError::RateUnavailable(pair.clone()));
        }

        let written_at = self.cache.put_fallback(key, rate);
        info!(rate, "Rate computed from fallback data");
        Ok(RateQuote::new(pair, rate, written_at, RateOrigin::Fallback))
    }

    fn blended_rate(&self, pair: &CurrencyPair, live: Option<&RateTable>) -> f64 {
        let usd_from = self.source.usd_rate(live, &pair.from);
        let usd_to = self.source.usd_rate(live, &pair.to);
        cross_rate(&pair.from, &pair.to, usd_from, usd_to)
    }
}
