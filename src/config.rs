use crate::CURRENCY_PRECISION;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// The default ceiling on how many missed occurrences a single catch-up may create.
// Ten years of weekly occurrences.
const DEFAULT_MAX_BACKLOG: u32 = 52 * 10;

/// Tunables for the budget and expense models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Decimal places that summarised totals are rounded to
    #[serde(default = "default_currency_precision")]
    pub currency_precision: u32,

    /// Maximum number of occurrences a recurring expense may materialise in one
    /// catch-up
    #[serde(default = "default_max_backlog")]
    pub max_backlog: u32,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not parse configuration")]
    Parse(#[from] serde_json::Error),
    #[error("max_backlog must be at least 1")]
    ZeroBacklog,
}

fn default_currency_precision() -> u32 {
    CURRENCY_PRECISION
}

fn default_max_backlog() -> u32 {
    DEFAULT_MAX_BACKLOG
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            currency_precision: default_currency_precision(),
            max_backlog: default_max_backlog(),
        }
    }
}

impl ModelConfig {
    /// Loads a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ModelConfig = serde_json::from_str(json)?;

        if config.max_backlog == 0 {
            return Err(ConfigError::ZeroBacklog);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.currency_precision, 2);
        assert_eq!(config.max_backlog, 520);
    }

    #[test]
    fn from_json_partial() {
        let config = ModelConfig::from_json(r#"{"max_backlog": 12}"#).unwrap();
        assert_eq!(config.currency_precision, 2);
        assert_eq!(config.max_backlog, 12);

        let config = ModelConfig::from_json("{}").unwrap();
        assert_eq!(config, ModelConfig::default());
    }

    #[test]
    fn from_json_rejects_zero_backlog() {
        assert!(matches!(
            ModelConfig::from_json(r#"{"max_backlog": 0}"#),
            Err(ConfigError::ZeroBacklog)
        ));
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            ModelConfig::from_json("max_backlog = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
