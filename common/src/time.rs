//! Time utilities and constants for Ratekeeper.

use chrono::{DateTime, Duration, Utc};

/// Timing constants.
pub mod constants {
    use super::Duration;

    /// Freshness window shared by the pair and table caches (10 minutes).
    pub fn rate_cache_ttl() -> Duration {
        Duration::minutes(10)
    }

    /// Bound on a single upstream rate fetch (5 seconds).
    pub fn provider_timeout() -> Duration {
        Duration::seconds(5)
    }
}

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Age of a timestamp relative to now, never negative.
pub fn age_of(timestamp: Timestamp) -> Duration {
    let age = now() - timestamp;
    if age < Duration::zero() {
        Duration::zero()
    } else {
        age
    }
}

/// Duration extensions for convenient construction.
pub trait DurationExt {
    fn as_std(&self) -> std::time::Duration;
}

impl DurationExt for Duration {
    fn as_std(&self) -> std::time::Duration {
        self.to_std().unwrap_or(std::time::Duration::ZERO)
    }
}
