//! Application configuration loaded from JSON

use crate::error::{PropvalError, Result};
use crate::explainability::ExplanationConfig;
use crate::inference::{AlwaysPromote, PromotionPolicy, RegressionGuard};
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Top-level settings for the CLI and the valuation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub training: TrainingConfig,
    pub explanation: ExplanationConfig,
    /// Directory holding bundle files and the registry index
    pub registry_dir: PathBuf,
    /// When set, retraining only promotes bundles whose held-out RMSE is
    /// within this ratio of the active bundle's
    pub max_rmse_increase_ratio: Option<f64>,
    /// Rows generated when training without a dataset
    pub synthetic_samples: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            training: TrainingConfig::default(),
            explanation: ExplanationConfig::default(),
            registry_dir: PathBuf::from("models"),
            max_rmse_increase_ratio: None,
            synthetic_samples: 1000,
        }
    }
}

impl AppConfig {
    /// Read and validate a JSON config file; absent keys take defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PropvalError::Config(format!("cannot open {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PropvalError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_registry_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.registry_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.training.validate()?;
        self.explanation.validate()?;
        if let Some(ratio) = self.max_rmse_increase_ratio {
            if !ratio.is_finite() || ratio < 0.0 {
                return Err(PropvalError::Config(format!(
                    "max_rmse_increase_ratio must be finite and non-negative, got {}",
                    ratio
                )));
            }
        }
        if self.synthetic_samples == 0 {
            return Err(PropvalError::Config("synthetic_samples must be positive".to_string()));
        }
        Ok(())
    }

    pub fn promotion_policy(&self) -> Box<dyn PromotionPolicy> {
        match self.max_rmse_increase_ratio {
            Some(ratio) => Box::new(RegressionGuard::new(ratio)),
            None => Box::new(AlwaysPromote),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_json_takes_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"registry_dir": "/tmp/propval", "training": {{"cv_folds": 3}}, "max_rmse_increase_ratio": 0.1}}"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.registry_dir, PathBuf::from("/tmp/propval"));
        assert_eq!(config.training.cv_folds, 3);
        assert_eq!(config.training.test_size, TrainingConfig::default().test_size);
        assert_eq!(config.explanation.top_k, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"explanation": {{"importance_weight": 2.0}}}}"#).unwrap();
        assert!(matches!(AppConfig::load(file.path()), Err(PropvalError::Config(_))));

        let config = AppConfig {
            max_rmse_increase_ratio: Some(-0.5),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
