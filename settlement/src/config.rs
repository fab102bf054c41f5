//! Configuration for the settlement engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settlement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Split calculator configuration
    pub ledger: expense_ledger::Config,

    /// Netting configuration
    pub netting: NettingConfig,

    /// Upper bound for one deadline-bounded computation (milliseconds)
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "expense-settlement".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            ledger: expense_ledger::Config::default(),
            netting: NettingConfig::default(),
            request_timeout_ms: 5_000,
        }
    }
}

/// Netting configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NettingConfig {
    /// Keep expenses with no recorded payer in the balances.
    ///
    /// Such expenses are pure debits, so enabling this makes the minimizer
    /// reject the group with `UnbalancedInput`.
    pub include_unpaid_expenses: bool,
}

impl Config {
    /// Request timeout as a `Duration`
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config {
            ledger: expense_ledger::Config::from_env()?,
            ..Config::default()
        };

        if let Ok(value) = std::env::var("SETTLEMENT_INCLUDE_UNPAID") {
            config.netting.include_unpaid_expenses = value.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid SETTLEMENT_INCLUDE_UNPAID: {}", e))
            })?;
        }

        if let Ok(value) = std::env::var("SETTLEMENT_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = value.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid SETTLEMENT_REQUEST_TIMEOUT_MS: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot honor
    pub fn validate(&self) -> crate::Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        self.ledger.validate()?;
        Ok(())
    }
}
