//! Audit chain configuration.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest possible run of leading zeros in a 64 character hex digest.
pub const MAX_DIFFICULTY: usize = 64;

/// Audit chain configuration.
///
/// Every field has a default, so a partial JSON document such as
/// `{"difficulty": 2}` is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Leading zero hex characters required of every mined block hash
    pub difficulty: usize,
    /// Maximum records sealed per block
    pub batch_size: usize,
    /// Delay before the next mining cycle when records remain queued
    pub retry_backoff_ms: u64,
    /// Upper bound on nonce attempts per cycle (`None` searches forever)
    pub max_nonce_attempts: Option<u64>,
    /// Nonce attempts between scheduler yields
    pub yield_every: u64,
}

impl ChainConfig {
    /// Set the difficulty.
    pub fn with_difficulty(mut self, difficulty: usize) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the retry backoff.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Set the nonce attempt bound.
    pub fn with_max_nonce_attempts(mut self, attempts: Option<u64>) -> Self {
        self.max_nonce_attempts = attempts;
        self
    }

    /// Set how many attempts run between yields.
    pub fn with_yield_every(mut self, attempts: u64) -> Self {
        self.yield_every = attempts;
        self
    }

    /// Retry backoff as a `Duration`.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Check the configuration for values the miner cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(Error::InvalidConfig(format!(
                "difficulty {} exceeds {}",
                self.difficulty, MAX_DIFFICULTY
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.yield_every == 0 {
            return Err(Error::InvalidConfig("yield_every must be at least 1".into()));
        }
        if self.max_nonce_attempts == Some(0) {
            return Err(Error::InvalidConfig(
                "max_nonce_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: 4,
            batch_size: 10,
            retry_backoff_ms: 1000,
            max_nonce_attempts: Some(5_000_000),
            yield_every: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChainConfig::default();
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.retry_backoff(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = ChainConfig::from_json(r#"{"difficulty": 2, "batch_size": 3}"#).unwrap();
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.retry_backoff_ms, 1000);
    }

    #[test]
    fn test_unbounded_attempts_from_json() {
        let config = ChainConfig::from_json(r#"{"max_nonce_attempts": null}"#).unwrap();
        assert_eq!(config.max_nonce_attempts, None);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(ChainConfig::default().with_difficulty(65).validate().is_err());
        assert!(ChainConfig::default().with_batch_size(0).validate().is_err());
        assert!(ChainConfig::default().with_yield_every(0).validate().is_err());
        assert!(ChainConfig::default()
            .with_max_nonce_attempts(Some(0))
            .validate()
            .is_err());
        assert!(matches!(
            ChainConfig::from_json(r#"{"batch_size": 0}"#),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = ChainConfig::default()
            .with_difficulty(1)
            .with_retry_backoff(Duration::from_millis(25));
        assert_eq!(config.difficulty, 1);
        assert_eq!(config.retry_backoff_ms, 25);
    }
}
