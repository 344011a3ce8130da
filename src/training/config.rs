//! Training configuration

use crate::error::{PropvalError, Result};
use crate::preprocessing::PreprocessingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Candidate model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Ordinary least squares with intercept
    LinearRegression,
    /// Bagged regression trees
    RandomForest,
    /// Gradient boosted regression trees
    GradientBoosting,
}

impl ModelType {
    pub const ALL: [ModelType; 3] = [
        ModelType::LinearRegression,
        ModelType::RandomForest,
        ModelType::GradientBoosting,
    ];

    /// Stable candidate name used in scores, bundles and logs
    pub fn name(&self) -> &'static str {
        match self {
            ModelType::LinearRegression => "linear_regression",
            ModelType::RandomForest => "random_forest",
            ModelType::GradientBoosting => "gradient_boosting",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(15),
            min_samples_split: 5,
            min_samples_leaf: 2,
        }
    }
}

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub subsample: f64,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.1,
            subsample: 0.8,
            min_samples_leaf: 1,
        }
    }
}

/// Minimum quality a candidate needs to be eligible for selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionThresholds {
    pub min_r2: f64,
    pub max_rmse: f64,
}

impl Default for SelectionThresholds {
    fn default() -> Self {
        Self {
            min_r2: 0.70,
            max_rmse: 50_000.0,
        }
    }
}

/// Configuration for model training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Random seed for splits, bootstrap and subsampling
    pub random_state: u64,

    /// Number of cross-validation folds over the training split (0 = no CV)
    pub cv_folds: usize,

    /// Fewer rows than this aborts training
    pub min_training_rows: usize,

    /// Candidate families to fit
    pub candidates: Vec<ModelType>,

    pub forest: ForestParams,

    pub boosting: BoostingParams,

    pub thresholds: SelectionThresholds,

    /// Abort if a candidate would start after this many seconds
    pub timeout_secs: Option<u64>,

    pub preprocessing: PreprocessingConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_state: 42,
            cv_folds: 5,
            min_training_rows: 10,
            candidates: ModelType::ALL.to_vec(),
            forest: ForestParams::default(),
            boosting: BoostingParams::default(),
            thresholds: SelectionThresholds::default(),
            timeout_secs: None,
            preprocessing: PreprocessingConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_candidates(mut self, candidates: impl Into<Vec<ModelType>>) -> Self {
        self.candidates = candidates.into();
        self
    }

    pub fn with_forest(mut self, forest: ForestParams) -> Self {
        self.forest = forest;
        self
    }

    pub fn with_boosting(mut self, boosting: BoostingParams) -> Self {
        self.boosting = boosting;
        self
    }

    pub fn with_thresholds(mut self, thresholds: SelectionThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_min_training_rows(mut self, rows: usize) -> Self {
        self.min_training_rows = rows;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PropvalError::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.cv_folds == 1 {
            return Err(PropvalError::Config(
                "cv_folds must be 0 (disabled) or at least 2".to_string(),
            ));
        }
        if self.candidates.is_empty() {
            return Err(PropvalError::Config("at least one candidate is required".to_string()));
        }
        if self.forest.n_estimators == 0 || self.boosting.n_estimators == 0 {
            return Err(PropvalError::Config("n_estimators must be positive".to_string()));
        }
        if !(self.boosting.learning_rate > 0.0) {
            return Err(PropvalError::Config(format!(
                "learning_rate must be positive, got {}",
                self.boosting.learning_rate
            )));
        }
        if !(self.boosting.subsample > 0.0 && self.boosting.subsample <= 1.0) {
            return Err(PropvalError::Config(format!(
                "subsample must be in (0, 1], got {}",
                self.boosting.subsample
            )));
        }
        if self.thresholds.min_r2.is_nan() || self.thresholds.max_rmse.is_nan() {
            return Err(PropvalError::Config("selection thresholds must not be NaN".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_state, 42);
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.candidates.len(), 3);
        assert_eq!(config.forest.max_depth, Some(15));
        assert_eq!(config.boosting.max_depth, 6);
        assert_eq!(config.thresholds.min_r2, 0.70);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: TrainingConfig =
            serde_json::from_str(r#"{"cv_folds": 0, "candidates": ["linear_regression"]}"#).unwrap();
        assert_eq!(config.cv_folds, 0);
        assert_eq!(config.candidates, vec![ModelType::LinearRegression]);
        assert_eq!(config.test_size, 0.2);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(TrainingConfig::default().with_test_size(0.0).validate().is_err());
        assert!(TrainingConfig::default().with_cv_folds(1).validate().is_err());
        assert!(TrainingConfig::default()
            .with_candidates(Vec::<ModelType>::new())
            .validate()
            .is_err());
    }
}
