//! Model explainability module
//!
//! Turns a trained model and a single prediction into something a person can read:
//! - Static feature importance extracted from model internals at training time
//! - Confidence score and label from importance concentration and held-out R²
//! - Natural-language narrative built from a per-feature phrase table
//! - Price interval around the point estimate

mod confidence;
mod importance;
mod interval;
mod narrative;

pub use confidence::{concentration, confidence_score, ConfidenceLabel, ImpactStrength};
pub use importance::{FeatureImportance, ImportanceEntry};
pub use interval::PriceRange;
pub use narrative::{build_narrative, feature_phrase, format_currency};

use crate::error::{PropvalError, Result};
use crate::property::PropertyRecord;
use crate::training::TrainedModel;
use serde::{Deserialize, Serialize};

/// Explanation settings, persisted with each bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    /// Weight of importance concentration in the confidence blend
    pub importance_weight: f64,
    /// Interval half-width in units of held-out RMSE
    pub interval_k: f64,
    /// Number of features mentioned in the narrative
    pub top_k: usize,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            importance_weight: 0.3,
            interval_k: 1.0,
            top_k: 3,
        }
    }
}

impl ExplanationConfig {
    pub fn with_importance_weight(mut self, weight: f64) -> Self {
        self.importance_weight = weight;
        self
    }

    pub fn with_interval_k(mut self, k: f64) -> Self {
        self.interval_k = k;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.importance_weight) {
            return Err(PropvalError::Config(format!(
                "importance_weight must be in [0, 1], got {}",
                self.importance_weight
            )));
        }
        if !self.interval_k.is_finite() || self.interval_k < 0.0 {
            return Err(PropvalError::Config(format!(
                "interval_k must be finite and non-negative, got {}",
                self.interval_k
            )));
        }
        Ok(())
    }
}

/// Per-prediction explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub confidence: f64,
    pub label: ConfidenceLabel,
    pub narrative: String,
}

/// Stateless explainer parameterized by an [`ExplanationConfig`]
#[derive(Debug, Clone, Default)]
pub struct ExplanationEngine {
    config: ExplanationConfig,
}

impl ExplanationEngine {
    pub fn new(config: ExplanationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExplanationConfig {
        &self.config
    }

    /// Importance computed once per bundle from the selected model
    pub fn static_importance(model: &TrainedModel, feature_names: &[String]) -> Result<FeatureImportance> {
        FeatureImportance::from_model(model, feature_names)
    }

    pub fn explain(
        &self,
        record: &PropertyRecord,
        predicted_price: f64,
        importance: &FeatureImportance,
        test_r2: f64,
    ) -> Explanation {
        let confidence = confidence_score(&importance.weights(), test_r2, self.config.importance_weight);
        let narrative = build_narrative(predicted_price, record, importance, self.config.top_k, confidence);
        Explanation {
            confidence,
            label: ConfidenceLabel::from_score(confidence),
            narrative,
        }
    }

    pub fn interval(&self, predicted_price: f64, test_rmse: f64) -> PriceRange {
        PriceRange::around(predicted_price, test_rmse, self.config.interval_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_config_validation() {
        assert!(ExplanationConfig::default().validate().is_ok());
        assert!(ExplanationConfig::default().with_importance_weight(1.5).validate().is_err());
        assert!(ExplanationConfig::default().with_interval_k(-1.0).validate().is_err());
    }

    #[test]
    fn test_explain_is_deterministic() {
        let names = vec!["area_sqft".to_string(), "bedrooms".to_string()];
        let importance = FeatureImportance::from_weights(&names, array![0.8, 0.2]);
        let record = PropertyRecord::new().with_number("area_sqft", 1800.0);
        let engine = ExplanationEngine::default();

        let a = engine.explain(&record, 420_000.0, &importance, 0.85);
        let b = engine.explain(&record, 420_000.0, &importance, 0.85);
        assert_eq!(a, b);
        assert!((0.0..=1.0).contains(&a.confidence));
        assert!(a.narrative.contains("Number of bedrooms (not provided)"));

        let range = engine.interval(420_000.0, 30_000.0);
        assert_eq!((range.low, range.high), (390_000.0, 450_000.0));
    }
}
