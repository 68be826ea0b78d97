//! Training configuration

use serde::{Deserialize, Serialize};

use crate::error::{Result, RisklabError};

/// Configuration for a training run.
///
/// The task type is not part of the configuration; it follows the dataset
/// the trainer is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Feature column names, in the order the model will expect them
    pub features: Vec<String>,
    /// Fraction of rows held out for the test partition
    pub test_fraction: f64,
    /// Seed for the split shuffle and the forest
    pub random_seed: u64,
    /// Number of trees in the forest
    pub n_trees: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            test_fraction: 0.2,
            random_seed: 42,
            n_trees: 100,
        }
    }
}

impl TrainConfig {
    /// Create a configuration for the given feature columns
    pub fn new(features: Vec<String>) -> Self {
        Self {
            features,
            ..Default::default()
        }
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_n_trees(mut self, n_trees: usize) -> Self {
        self.n_trees = n_trees;
        self
    }

    /// Check the parameter ranges that do not depend on the table.
    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(RisklabError::InvalidParameter {
                name: "features".to_string(),
                value: "[]".to_string(),
                reason: "at least one feature column is required".to_string(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for feature in &self.features {
            if !seen.insert(feature.as_str()) {
                return Err(RisklabError::InvalidParameter {
                    name: "features".to_string(),
                    value: feature.clone(),
                    reason: "duplicate feature column".to_string(),
                });
            }
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(RisklabError::InvalidParameter {
                name: "test_fraction".to_string(),
                value: format!("{}", self.test_fraction),
                reason: "must lie in (0, 1)".to_string(),
            });
        }
        if self.n_trees == 0 {
            return Err(RisklabError::InvalidParameter {
                name: "n_trees".to_string(),
                value: "0".to_string(),
                reason: "the forest needs at least one tree".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainConfig::default();
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.n_trees, 100);
        assert!(config.features.is_empty());
    }

    #[test]
    fn test_builder_pattern() {
        let config = TrainConfig::new(vec!["Age".to_string()])
            .with_test_fraction(0.3)
            .with_random_seed(7)
            .with_n_trees(50);
        assert_eq!(config.features, vec!["Age".to_string()]);
        assert_eq!(config.test_fraction, 0.3);
        assert_eq!(config.random_seed, 7);
        assert_eq!(config.n_trees, 50);
    }

    #[test]
    fn test_validate_rejects_empty_features() {
        let err = TrainConfig::default().validate().unwrap_err();
        assert!(matches!(err, RisklabError::InvalidParameter { .. }));
    }

    #[test]
    fn test_validate_rejects_duplicate_features() {
        let config = TrainConfig::new(vec!["Age".to_string(), "Age".to_string()]);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RisklabError::InvalidParameter { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        for fraction in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            let config = TrainConfig::new(vec!["Age".to_string()]).with_test_fraction(fraction);
            assert!(config.validate().is_err(), "fraction {} should fail", fraction);
        }
        let config = TrainConfig::new(vec!["Age".to_string()]).with_test_fraction(0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_trees() {
        let config = TrainConfig::new(vec!["Age".to_string()]).with_n_trees(0);
        assert!(config.validate().is_err());
    }
}
