//! Rate provider trait and the HTTP upstream implementation.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use ratekeeper_common::CurrencyCode;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{FxError, FxResult, ProviderError};
use crate::RateTable;

/// Default upstream host.
pub const DEFAULT_PROVIDER_URL: &str = "https://api.exchangerate-api.com";

/// Source of live rate tables.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Fetch the full rate table for `base`, in units of each currency per
    /// one unit of `base`. Makes a single attempt.
    async fn fetch(&self, base: &CurrencyCode) -> Result<RateTable, ProviderError>;
}

/// Configuration for the HTTP provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Scheme and host of the upstream, without trailing slash.
    pub base_url: String,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PROVIDER_URL.to_string(),
            user_agent: format!("ratekeeper/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("RATEKEEPER_PROVIDER_URL") {
            config.base_url = url;
        }

        if let Ok(agent) = std::env::var("RATEKEEPER_USER_AGENT") {
            config.user_agent = agent;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Provider URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(format!("Provider URL must be http(s): {}", self.base_url));
        }

        Ok(())
    }
}

/// Upstream response body.
#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    base: Option<String>,
    #[serde(default)]
    date: Option<String>,
    rates: HashMap<String, f64>,
}

/// Fetches `/v4/latest/{BASE}` from an exchangerate-api compatible host.
#[derive(Debug, Clone)]
pub struct HttpRateProvider {
    client: Client,
    config: ProviderConfig,
}

impl HttpRateProvider {
    /// Create a provider with its own HTTP client.
    pub fn new(config: ProviderConfig) -> FxResult<Self> {
        config.validate().map_err(FxError::Configuration)?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FxError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn latest_url(&self, base: &CurrencyCode) -> String {
        format!(
            "{}/v4/latest/{}",
            self.config.base_url.trim_end_matches('/'),
            base
        )
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    fn name(&self) -> &str {
        "exchangerate-api"
    }

    async fn fetch(&self, base: &CurrencyCode) -> Result<RateTable, ProviderError> {
        let url = self.latest_url(base);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let body: LatestRatesResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Decode(e.to_string()))?;

        if body.success == Some(false) {
            return Err(ProviderError::Unsuccessful);
        }

        debug!(
            base = %base,
            reported_base = body.base.as_deref().unwrap_or("-"),
            date = body.date.as_deref().unwrap_or("-"),
            currencies = body.rates.len(),
            "Fetched live rates"
        );

        Ok(normalize_rates(body.rates))
    }
}

/// Key the upstream rates by normalized code. When two keys differ only in
/// case, the one already in canonical form wins.
fn normalize_rates(raw: HashMap<String, f64>) -> RateTable {
    let mut table = RateTable::new();
    let mut canonical = HashSet::new();

    for (key, rate) in raw {
        let code = CurrencyCode::new(&key);
        let is_canonical = code.code() == key;

        if table.contains_key(&code) {
            warn!(code = %code, key = %key, "Upstream repeats a currency with different case");
            if !is_canonical || canonical.contains(&code) {
                continue;
            }
        }

        if is_canonical {
            canonical.insert(code.clone());
        }
        table.insert(code, rate);
    }

    table
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    rates: parking_lot::RwLock<Option<RateTable>>,
    delay: Option<std::time::Duration>,
    calls: std::sync::atomic::AtomicUsize,
    last_base: parking_lot::Mutex<Option<CurrencyCode>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a mock that serves `rates` for every fetch.
    pub fn new(name: impl Into<String>, rates: RateTable) -> Self {
        Self {
            name: name.into(),
            rates: parking_lot::RwLock::new(Some(rates)),
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
            last_base: parking_lot::Mutex::new(None),
        }
    }

    /// Create a mock whose every fetch fails.
    pub fn failing(name: impl Into<String>) -> Self {
        let provider = Self::new(name, RateTable::new());
        provider.set_failing();
        provider
    }

    /// Delay every response.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Serve `rates` from now on.
    pub fn set_rates(&self, rates: RateTable) {
        *self.rates.write() = Some(rates);
    }

    /// Fail every fetch from now on.
    pub fn set_failing(&self) {
        *self.rates.write() = None;
    }

    /// Number of fetches made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Base currency of the most recent fetch.
    pub fn last_base(&self) -> Option<CurrencyCode> {
        self.last_base.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, base: &CurrencyCode) -> Result<RateTable, ProviderError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.last_base.lock() = Some(base.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.rates
            .read()
            .clone()
            .ok_or_else(|| ProviderError::Network("mock provider is down".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn provider_for(server: &MockServer) -> HttpRateProvider {
        HttpRateProvider::new(ProviderConfig {
            base_url: server.uri(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_decodes_rates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/latest/USD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "timestamp": 1700000000,
                "base": "USD",
                "date": "2023-11-14",
                "rates": { "USD": 1.0, "EUR": 0.91, "gbp": 0.8 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let rates = provider.fetch(&CurrencyCode::new("usd")).await.unwrap();

        assert_eq!(rates.len(), 3);
        assert_eq!(rates.get(&CurrencyCode::eur()), Some(&0.91));
        assert_eq!(rates.get(&CurrencyCode::gbp()), Some(&0.8));
    }

    #[tokio::test]
    async fn test_missing_success_field_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/latest/USD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "base": "USD",
                "rates": { "EUR": 0.9 }
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let rates = provider.fetch(&CurrencyCode::usd()).await.unwrap();

        assert_eq!(rates.get(&CurrencyCode::eur()), Some(&0.9));
    }

    #[tokio::test]
    async fn test_http_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let result = provider.fetch(&CurrencyCode::usd()).await;

        assert!(matches!(result, Err(ProviderError::HttpStatus { status: 429 })));
    }

    #[tokio::test]
    async fn test_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let result = provider.fetch(&CurrencyCode::usd()).await;

        assert!(matches!(result, Err(ProviderError::Decode(_))));
    }

    #[tokio::test]
    async fn test_unsuccessful_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "rates": {}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server).await;
        let result = provider.fetch(&CurrencyCode::usd()).await;

        assert!(matches!(result, Err(ProviderError::Unsuccessful)));
    }

    #[tokio::test]
    async fn test_network_error() {
        let provider = HttpRateProvider::new(ProviderConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        })
        .unwrap();

        let result = provider.fetch(&CurrencyCode::usd()).await;

        assert!(matches!(result, Err(ProviderError::Network(_))));
    }

    #[test]
    fn test_config_validation() {
        assert!(ProviderConfig::default().validate().is_ok());

        let config = ProviderConfig {
            base_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ProviderConfig {
            base_url: "ftp://rates.example".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(HttpRateProvider::new(config).is_err());
    }

    #[tokio::test]
    async fn test_mock_provider_counts_calls() {
        let provider = MockRateProvider::new("test", RateTable::new());
        assert!(provider.fetch(&CurrencyCode::usd()).await.is_ok());

        provider.set_failing();
        assert!(provider.fetch(&CurrencyCode::usd()).await.is_err());
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.last_base(), Some(CurrencyCode::usd()));
    }

    #[test]
    fn test_uppercase_key_wins_case_collision() {
        // Fresh maps get fresh hash seeds, so iteration order varies per round.
        for _ in 0..32 {
            let raw: HashMap<String, f64> = [("gbp", 0.5), ("GBP", 0.79), ("Gbp", 0.6), ("eur", 0.92)]
                .into_iter()
                .map(|(code, rate)| (code.to_string(), rate))
                .collect();

            let table = normalize_rates(raw);

            assert_eq!(table.len(), 2);
            assert_eq!(table[&CurrencyCode::gbp()], 0.79);
            assert_eq!(table[&CurrencyCode::eur()], 0.92);
        }
    }
}
