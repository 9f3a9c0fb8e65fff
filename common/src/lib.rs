//! Ratekeeper Common Types
//!
//! Shared types used across Ratekeeper crates: currency codes and pairs,
//! the caller-facing error taxonomy, and timing constants.

pub mod currency;
pub mod error;
pub mod time;

pub use currency::*;
pub use error::*;
pub use time::*;
