//! Live and fallback rate sources shared by the conversion and table paths.

use std::sync::Arc;
use std::time::Duration;

use ratekeeper_common::CurrencyCode;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::fallback::{FallbackRateTable, UNKNOWN_CURRENCY_RATE};
use crate::metrics::EngineMetrics;
use crate::provider::RateProvider;
use crate::RateTable;

/// Wraps the upstream provider with a deadline and pairs it with the
/// fallback table.
pub struct RateSource {
    provider: Arc<dyn RateProvider>,
    fallback: FallbackRateTable,
    timeout: Duration,
    metrics: Arc<EngineMetrics>,
}

impl RateSource {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        fallback: FallbackRateTable,
        timeout: Duration,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            provider,
            fallback,
            timeout,
            metrics,
        }
    }

    pub fn fallback(&self) -> &FallbackRateTable {
        &self.fallback
    }

    /// Fetch the live USD table, bounded by the configured timeout.
    pub async fn fetch_usd_table(&self) -> Result<RateTable, ProviderError> {
        self.metrics.provider_fetch();

        let base = CurrencyCode::usd();
        let result = match tokio::time::timeout(self.timeout, self.provider.fetch(&base)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        };

        match &result {
            Ok(rates) => debug!(
                provider = self.provider.name(),
                currencies = rates.len(),
                "Live rates fetched"
            ),
            Err(e) => {
                self.metrics.provider_failure();
                warn!(
                    provider = self.provider.name(),
                    error = %e,
                    "Rate provider failed, degrading to fallback rates"
                );
            }
        }

        result
    }

    /// USD-denominated rate for `code`: the live value when `live` has one,
    /// otherwise the fallback value, otherwise 1.0.
    pub fn usd_rate(&self, live: Option<&RateTable>, code: &CurrencyCode) -> f64 {
        if let Some(rate) = live.and_then(|table| table.get(code)) {
            return *rate;
        }

        match self.fallback.get(code) {
            Some(rate) => {
                if live.is_some() {
                    debug!(currency = %code, "Currency missing from live rates, using fallback");
                }
                rate
            }
            None => {
                warn!(
                    currency = %code,
                    rate = UNKNOWN_CURRENCY_RATE,
                    "Currency unknown to live and fallback rates, treating as USD-equivalent"
                );
                UNKNOWN_CURRENCY_RATE
            }
        }
    }
}
