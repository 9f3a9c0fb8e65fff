//! Full rate tables for an arbitrary base currency.

use std::sync::Arc;

use ratekeeper_common::{CurrencyCode, Timestamp};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CachedValue, TableCache};
use crate::error::{FxError, FxResult};
use crate::metrics::EngineMetrics;
use crate::source::RateSource;
use crate::RateTable;

/// Rate table for one base currency.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateTableSnapshot {
    pub base: CurrencyCode,
    pub rates: RateTable,
    pub last_updated: Timestamp,
}

/// Re-express a USD-denominated table in terms of `base`.
///
/// For USD the table is returned unchanged. For any other base each entry
/// becomes `rate / rate[base]` and the base itself is left out. An empty
/// table means `base` is not in `usd_table`.
pub fn rebase_table(base: &CurrencyCode, usd_table: &RateTable) -> RateTable {
    if base.is_pivot() {
        return usd_table.clone();
    }

    let base_rate = match usd_table.get(base) {
        Some(rate) => *rate,
        None => return RateTable::new(),
    };

    usd_table
        .iter()
        .filter(|(code, _)| *code != base)
        .map(|(code, rate)| (code.clone(), rate / base_rate))
        .collect()
}

/// Split a `currencies=` query value into codes. Blank items are skipped;
/// an input with no codes at all means "no filter".
pub fn parse_currency_filter(csv: &str) -> Option<Vec<CurrencyCode>> {
    let codes: Vec<CurrencyCode> = csv
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(CurrencyCode::new)
        .collect();

    if codes.is_empty() {
        None
    } else {
        Some(codes)
    }
}

fn apply_filter(rates: RateTable, filter: Option<&[CurrencyCode]>) -> RateTable {
    match filter {
        None => rates,
        Some(codes) => codes
            .iter()
            .filter_map(|code| rates.get(code).map(|rate| (code.clone(), *rate)))
            .collect(),
    }
}

fn is_usable_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

fn table_is_usable(table: &RateTable) -> bool {
    table.values().all(|rate| is_usable_rate(*rate))
}

/// Drop entries that cannot be used as rates. Returns how many went.
fn retain_usable(table: &mut RateTable) -> usize {
    let before = table.len();
    table.retain(|_, rate| is_usable_rate(*rate));
    before - table.len()
}

/// Answers whole-table requests, caching each base currency.
pub struct RateTableService {
    source: Arc<RateSource>,
    cache: TableCache,
    metrics: Arc<EngineMetrics>,
    serve_stale_on_failure: bool,
}

impl RateTableService {
    pub fn new(
        source: Arc<RateSource>,
        cache: TableCache,
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

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    /// Get the rate table for `base`, optionally narrowed to `filter`.
    ///
    /// The full table is cached; the filter only shapes the returned copy.
    /// Unknown filter codes are dropped without error.
    #[instrument(skip(self, filter), fields(base = %base))]
    pub async fn rates_for(
        &self,
        base: &CurrencyCode,
        filter: Option<&[CurrencyCode]>,
    ) -> FxResult<RateTableSnapshot> {
        let (rates, last_updated) = self.full_table(base).await?;

        Ok(RateTableSnapshot {
            base: base.clone(),
            rates: apply_filter(rates, filter),
            last_updated,
        })
    }

    async fn full_table(&self, base: &CurrencyCode) -> FxResult<(RateTable, Timestamp)> {
        let key = base.code();
        let cached = self.cache.get(key);
        if let Some(hit) = cached.as_ref().filter(|hit| hit.fresh) {
            debug!("Using cached rate table");
            self.metrics.cache_hit();
            return Ok((hit.value.clone(), hit.written_at));
        }
        self.metrics.cache_miss();

        match self.source.fetch_usd_table().await {
            Ok(live) => {
                let base_rate_unusable = live.get(base).is_some_and(|rate| !is_usable_rate(*rate));
                if !base_rate_unusable {
                    let mut table = rebase_table(base, &live);
                    let dropped = retain_usable(&mut table);
                    if dropped > 0 {
                        warn!(dropped, "Ignoring unusable entries in live rates");
                    }
                    if table.is_empty() {
                        debug!("Base currency missing from live rates, table is empty");
                    }
                    let written_at = self.cache.put_fresh(key, table.clone());
                    info!(currencies = table.len(), "Rate table computed from live data");
                    return Ok((table, written_at));
                }
                warn!("Live rate for the base currency is unusable, recomputing table from fallback");
            }
            Err(_) => {
                if let Some(CachedValue {
                    value, written_at, age, ..
                }) = cached.filter(|_| self.serve_stale_on_failure)
                {
                    self.metrics.stale_served();
                    warn!(age_secs = age.num_seconds(), "Serving stale cached rate table");
                    return Ok((value, written_at));
                }
            }
        }

        self.table_from_fallback(base)
    }

    fn table_from_fallback(&self, base: &CurrencyCode) -> FxResult<(RateTable, Timestamp)> {
        self.metrics.fallback_computation();

        let table = rebase_table(base, &self.source.fallback().to_table());
        if !table_is_usable(&table) {
            return Err(FxError::TableUnavailable(base.clone()));
        }

        let written_at = self.cache.put_fallback(base.code(), table.clone());
        info!(currencies = table.len(), "Rate table computed from fallback data");
        Ok((table, written_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FallbackRateTable;
    use crate::provider::MockRateProvider;
    use std::time::Duration;

    fn usd_table(entries: &[(&str, f64)]) -> RateTable {
        entries
            .iter()
            .map(|(code, rate)| (CurrencyCode::new(code), *rate))
            .collect()
    }

    fn service_with(provider: Arc<MockRateProvider>) -> RateTableService {
        let metrics = Arc::new(EngineMetrics::new());
        let source = Arc::new(RateSource::new(
            provider,
            FallbackRateTable::standard(),
            Duration::from_secs(5),
            metrics.clone(),
        ));
        RateTableService::new(source, TableCache::new("table"), metrics, false)
    }

    #[test]
    fn test_rebase_usd_is_identity() {
        let table = usd_table(&[("USD", 1.0), ("EUR", 0.85)]);
        assert_eq!(rebase_table(&CurrencyCode::usd(), &table), table);
    }

    #[test]
    fn test_rebase_excludes_base() {
        let table = usd_table(&[("USD", 1.0), ("EUR", 0.85), ("GBP", 0.73)]);
        let rebased = rebase_table(&CurrencyCode::eur(), &table);

        assert_eq!(rebased.len(), 2);
        assert!(!rebased.contains_key(&CurrencyCode::eur()));
        assert_eq!(rebased[&CurrencyCode::usd()], 1.0 / 0.85);
        assert_eq!(rebased[&CurrencyCode::gbp()], 0.73 / 0.85);
    }

    #[test]
    fn test_rebase_unknown_base_is_empty() {
        let table = usd_table(&[("USD", 1.0), ("EUR", 0.85)]);
        assert!(rebase_table(&CurrencyCode::new("XYZ"), &table).is_empty());
    }

    #[test]
    fn test_parse_currency_filter() {
        let codes = parse_currency_filter("gbp, jpy,,XYZ ").unwrap();
        assert_eq!(
            codes,
            vec![CurrencyCode::gbp(), CurrencyCode::jpy(), CurrencyCode::new("XYZ")]
        );
        assert!(parse_currency_filter(" , ").is_none());
        assert!(parse_currency_filter("").is_none());
    }

    #[tokio::test]
    async fn test_filter_applied_after_caching() {
        let provider = Arc::new(MockRateProvider::new(
            "live",
            usd_table(&[("USD", 1.0), ("EUR", 0.9), ("GBP", 0.8), ("JPY", 150.0)]),
        ));
        let service = service_with(provider.clone());
        let filter = vec![CurrencyCode::new("gbp")];

        let snapshot = service
            .rates_for(&CurrencyCode::eur(), Some(filter.as_slice()))
            .await
            .unwrap();

        assert_eq!(snapshot.rates.len(), 1);
        assert_eq!(snapshot.rates[&CurrencyCode::gbp()], 0.8 / 0.9);

        // The cached table is the full one.
        let cached = service.cache().get_fresh("EUR").unwrap();
        assert_eq!(cached.value.len(), 3);

        // A second request without a filter is served from cache.
        let snapshot = service.rates_for(&CurrencyCode::eur(), None).await.unwrap();
        assert_eq!(snapshot.rates.len(), 3);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unusable_live_entry_is_dropped() {
        let provider = Arc::new(MockRateProvider::new(
            "live",
            usd_table(&[("USD", 1.0), ("EUR", 0.9), ("GBP", 0.8), ("ZZZ", 0.0)]),
        ));
        let service = service_with(provider);

        let snapshot = service.rates_for(&CurrencyCode::usd(), None).await.unwrap();
        assert_eq!(snapshot.rates.len(), 3);
        assert_eq!(snapshot.rates.get(&CurrencyCode::eur()), Some(&0.9));
        assert!(!snapshot.rates.contains_key(&CurrencyCode::new("ZZZ")));

        let snapshot = service.rates_for(&CurrencyCode::eur(), None).await.unwrap();
        assert_eq!(snapshot.rates.len(), 2);
        assert_eq!(snapshot.rates[&CurrencyCode::gbp()], 0.8 / 0.9);
    }

    #[tokio::test]
    async fn test_unusable_live_base_uses_fallback() {
        let provider = Arc::new(MockRateProvider::new(
            "live",
            usd_table(&[("USD", 1.0), ("EUR", f64::NAN), ("GBP", 0.8)]),
        ));
        let service = service_with(provider);

        let snapshot = service.rates_for(&CurrencyCode::eur(), None).await.unwrap();

        assert_eq!(snapshot.rates.len(), FallbackRateTable::standard().len() - 1);
        assert_eq!(snapshot.rates[&CurrencyCode::usd()], 1.0 / 0.85);
    }

    #[tokio::test]
    async fn test_non_usd_base_fetches_usd_table() {
        let provider = Arc::new(MockRateProvider::new(
            "live",
            usd_table(&[("USD", 1.0), ("EUR", 0.9), ("GBP", 0.8)]),
        ));
        let service = service_with(provider.clone());

        service.rates_for(&CurrencyCode::gbp(), None).await.unwrap();

        assert_eq!(provider.last_base(), Some(CurrencyCode::usd()));
    }

    #[tokio::test]
    async fn test_base_missing_from_live_is_empty() {
        let provider = Arc::new(MockRateProvider::new("live", usd_table(&[("USD", 1.0), ("EUR", 0.9)])));
        let service = service_with(provider);

        let snapshot = service
            .rates_for(&CurrencyCode::new("XYZ"), None)
            .await
            .unwrap();

        assert!(snapshot.rates.is_empty());
        assert!(service.cache().get_fresh("XYZ").is_some());
    }

    #[tokio::test]
    async fn test_fallback_table_is_half_expired() {
        let service = service_with(Arc::new(MockRateProvider::failing("down")));

        let snapshot = service.rates_for(&CurrencyCode::gbp(), None).await.unwrap();

        assert_eq!(snapshot.rates.len(), FallbackRateTable::standard().len() - 1);
        let hit = service.cache().get("GBP").unwrap();
        assert!(hit.fresh);
        assert!(hit.age >= service.cache().ttl() / 2);
        assert_eq!(hit.written_at, snapshot.last_updated);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = RateTableSnapshot {
            base: CurrencyCode::eur(),
            rates: usd_table(&[("GBP", 0.86)]),
            last_updated: ratekeeper_common::now(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["base"], "EUR");
        assert_eq!(json["rates"]["GBP"], 0.86);
        assert!(json.get("lastUpdated").is_some());
    }
}
