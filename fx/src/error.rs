//! FX engine error types.

use std::time::Duration;

use ratekeeper_common::{CurrencyCode, CurrencyPair, ServiceError};
use thiserror::Error;

/// Failure of a single upstream rate fetch.
///
/// These never reach callers of the engine; they are logged and answered
/// with fallback data.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Upstream answered with a non-2xx status.
    #[error("Upstream returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// Connection or transport failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Body could not be decoded into a rate table.
    #[error("Failed to decode rate response: {0}")]
    Decode(String),

    /// Body decoded but reported `success: false`.
    #[error("Upstream reported an unsuccessful response")]
    Unsuccessful,

    /// The caller-imposed deadline elapsed before the upstream answered.
    #[error("Rate fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors that can escape the FX engine.
#[derive(Debug, Error)]
pub enum FxError {
    /// Neither live nor fallback data produced a usable rate.
    #[error("Rate not available for {0}")]
    RateUnavailable(CurrencyPair),

    /// Neither live nor fallback data produced a usable table.
    #[error("Rate table not available for base {0}")]
    TableUnavailable(CurrencyCode),

    /// Engine or provider misconfiguration.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<FxError> for ServiceError {
    fn from(err: FxError) -> Self {
        match err {
            FxError::Configuration(message) => ServiceError::Configuration(message),
            unavailable => ServiceError::ExternalService(unavailable.to_string()),
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
