//! Runtime configuration

use crate::error::{Result, RuntimeError};
use serde::{Deserialize, Serialize};

/// Limits applied to every contract invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Compute units granted to a single invocation
    pub compute_budget: u64,
    /// Maximum storage key (and map field) size in bytes
    pub max_key_size: usize,
    /// Maximum storage value size in bytes
    pub max_value_size: usize,
    /// Maximum transfer memo size in bytes
    pub max_memo_size: usize,
    /// Maximum `console.log` message size in bytes
    pub max_log_length: usize,
    /// Emit contract log output
    pub debug: bool,
}

impl RuntimeConfig {
    /// Default compute budget (200,000 CU, same as Solana)
    pub const DEFAULT_COMPUTE_BUDGET: u64 = 200_000;

    /// Maximum compute budget (1,400,000 CU, same as Solana)
    pub const MAX_COMPUTE_BUDGET: u64 = 1_400_000;

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| RuntimeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the limits are usable
    pub fn validate(&self) -> Result<()> {
        if self.compute_budget == 0 {
            return Err(RuntimeError::InvalidConfig("compute budget is zero".into()));
        }
        if self.compute_budget > Self::MAX_COMPUTE_BUDGET {
            return Err(RuntimeError::InvalidConfig(format!(
                "compute budget {} exceeds maximum {}",
                self.compute_budget,
                Self::MAX_COMPUTE_BUDGET
            )));
        }
        if self.max_key_size == 0 {
            return Err(RuntimeError::InvalidConfig("max key size is zero".into()));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            compute_budget: Self::DEFAULT_COMPUTE_BUDGET,
            max_key_size: 256,
            max_value_size: 65_536,
            max_memo_size: 512,
            max_log_length: 10_000,
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = RuntimeConfig::from_json(r#"{ "compute_budget": 500000, "debug": true }"#).unwrap();
        assert_eq!(config.compute_budget, 500_000);
        assert!(config.debug);
        assert_eq!(config.max_key_size, 256);
        assert_eq!(config.max_memo_size, 512);
    }

    #[test]
    fn test_budget_above_maximum_is_rejected() {
        let err = RuntimeConfig::from_json(r#"{ "compute_budget": 2000000 }"#).unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(RuntimeConfig::from_json("{ compute_budget").is_err());
    }
}
