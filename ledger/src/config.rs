//! Configuration for the split calculator

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How far the percentage total may be from 100.
    ///
    /// The default of 0.005 accepts any total that reads 100.00 at two
    /// decimal places.
    pub percentage_tolerance: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            percentage_tolerance: Decimal::new(5, 3),
        }
    }
}

impl Config {
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
        let mut config = Config::default();

        if let Ok(tolerance) = std::env::var("LEDGER_PERCENTAGE_TOLERANCE") {
            config.percentage_tolerance = tolerance.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_PERCENTAGE_TOLERANCE: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the calculator cannot honor
    pub fn validate(&self) -> crate::Result<()> {
        if self.percentage_tolerance < Decimal::ZERO || self.percentage_tolerance >= Decimal::ONE {
            return Err(crate::Error::Config(format!(
                "percentage_tolerance must be in [0, 1), got {}",
                self.percentage_tolerance
            )));
        }
        Ok(())
    }
}
