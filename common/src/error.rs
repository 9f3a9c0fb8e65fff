//! Caller-facing error taxonomy for Ratekeeper.

use thiserror::Error;

/// Errors reported to whatever sits in front of the rate engine
/// (an HTTP route, the CLI).
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Malformed input, rejected before reaching the rate engine.
    #[error("Invalid input: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Neither live nor fallback data could produce a result.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Create a validation error for a named input field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::ExternalService(_))
    }

    /// Get error code for response bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Validation { .. } => "VALIDATION_ERROR",
            ServiceError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            ServiceError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }

    /// HTTP status a route layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation { .. } => 400,
            ServiceError::ExternalService(_) => 502,
            ServiceError::Configuration(_) => 500,
        }
    }
}

/// Result type alias for caller-facing operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
