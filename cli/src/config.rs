//! CLI configuration.

use ratekeeper_fx::{FxEngineConfig, ProviderConfig};

/// Main CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Engine configuration.
    pub engine: FxEngineConfig,
    /// Upstream provider configuration.
    pub provider: ProviderConfig,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            engine: FxEngineConfig::default(),
            provider: ProviderConfig::default(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            engine: FxEngineConfig::from_env(),
            provider: ProviderConfig::from_env(),
            ..Self::default()
        };

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.json_logs = format.eq_ignore_ascii_case("json");
        }

        config
    }

    /// Override the provider timeout from a whole number of seconds.
    pub fn set_provider_timeout_secs(&mut self, secs: i64) -> Result<(), String> {
        self.engine.provider_timeout = chrono::Duration::try_seconds(secs)
            .ok_or_else(|| format!("Timeout out of range: {} seconds", secs))?;
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.engine.validate()?;
        self.provider.validate()?;

        if self.log_level.is_empty() {
            return Err("Log level cannot be empty".to_string());
        }

        Ok(())
    }
}
