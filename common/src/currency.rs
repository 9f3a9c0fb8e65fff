//! Currency identifiers used throughout Ratekeeper.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The pivot currency every live and fallback table is denominated in.
pub const PIVOT_CODE: &str = "USD";

/// ISO 4217 currency code.
///
/// Always stored uppercase, so two codes that differ only in case compare
/// equal and build the same cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a new currency code, normalizing to uppercase.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    /// Get the code as a string slice.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// The pivot currency (USD).
    pub fn usd() -> Self {
        Self(PIVOT_CODE.to_string())
    }

    pub fn eur() -> Self {
        Self::new("EUR")
    }

    pub fn gbp() -> Self {
        Self::new("GBP")
    }

    pub fn jpy() -> Self {
        Self::new("JPY")
    }

    /// Whether this is the pivot currency.
    pub fn is_pivot(&self) -> bool {
        self.0 == PIVOT_CODE
    }

    /// Whether the code has the shape of an ISO 4217 code (three ASCII letters).
    ///
    /// The rate engine never checks this itself; it is for callers that
    /// validate input before handing it over.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 3 && self.0.bytes().all(|b| b.is_ascii_uppercase())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CurrencyCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An ordered from/to currency pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Currency being converted from.
    pub from: CurrencyCode,
    /// Currency being converted to.
    pub to: CurrencyCode,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(from: impl Into<CurrencyCode>, to: impl Into<CurrencyCode>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Whether both sides are the same currency.
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    /// Key used by the pair cache, e.g. `EUR_GBP`.
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.from, self.to)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}
