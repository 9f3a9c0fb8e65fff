//! Ratekeeper FX Engine
//!
//! Exchange-rate acquisition, caching and conversion in front of an
//! unreliable, rate-limited upstream provider.
//!
//! # Features
//!
//! - Single-attempt HTTP provider with a caller-side deadline
//! - Pair and table caches with lazy TTL expiry
//! - Static fallback rates whenever live data is missing or unreachable
//! - Cross rates through the USD pivot
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ratekeeper_fx::{FxEngine, FxEngineConfig, HttpRateProvider, ProviderConfig};
//!
//! let provider = Arc::new(HttpRateProvider::new(ProviderConfig::default())?);
//! let engine = FxEngine::new(provider, FxEngineConfig::default());
//!
//! // 100 EUR in GBP
//! let conversion = engine.convert_amount("EUR", "GBP", 100.0).await?;
//!
//! // Whole table for JPY
//! let table = engine.rates_for("JPY", None).await?;
//! ```

use std::collections::BTreeMap;

use ratekeeper_common::CurrencyCode;

pub mod cache;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod metrics;
pub mod provider;
pub mod rates;
pub mod source;

/// Units of each currency per one unit of a base currency.
pub type RateTable = BTreeMap<CurrencyCode, f64>;

pub use cache::{CacheStats, CachedValue, PairCache, RateCache, TableCache};
pub use conversion::{Conversion, ConversionEngine, RateOrigin, RateQuote};
pub use engine::{FxEngine, FxEngineConfig, FxEngineStats};
pub use error::{FxError, FxResult, ProviderError};
pub use fallback::FallbackRateTable;
pub use provider::{HttpRateProvider, ProviderConfig, RateProvider};
pub use rates::{parse_currency_filter, RateTableService, RateTableSnapshot};
