//! Static feature importance computed once at training time

use crate::error::{PropvalError, Result};
use crate::training::{normalize_importance, TrainedModel};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// One feature's share of the model's importance signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceEntry {
    pub feature: String,
    pub weight: f64,
}

/// Ordered feature name → weight map; weights sum to 1.0 when non-empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    entries: Vec<ImportanceEntry>,
}

impl FeatureImportance {
    /// Extract importances from a trained model's internals
    pub fn from_model(model: &TrainedModel, feature_names: &[String]) -> Result<Self> {
        let weights = model.importance();
        if weights.len() != feature_names.len() {
            return Err(PropvalError::ShapeError {
                expected: format!("{} importance weights", feature_names.len()),
                actual: format!("{} importance weights", weights.len()),
            });
        }
        Ok(Self::from_weights(feature_names, weights))
    }

    /// Build from raw weights, renormalizing (all-zero becomes uniform)
    pub fn from_weights(feature_names: &[String], weights: Array1<f64>) -> Self {
        let weights = normalize_importance(weights);
        Self {
            entries: feature_names
                .iter()
                .zip(weights.iter())
                .map(|(feature, &weight)| ImportanceEntry {
                    feature: feature.clone(),
                    weight,
                })
                .collect(),
        }
    }

    /// Entries in feature order
    pub fn entries(&self) -> &[ImportanceEntry] {
        &self.entries
    }

    pub fn weights(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.weight).collect()
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.feature == feature).map(|e| e.weight)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries by descending weight; ties keep feature order
    pub fn ranked(&self) -> Vec<&ImportanceEntry> {
        let mut ranked: Vec<&ImportanceEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        ranked
    }

    pub fn top_k(&self, k: usize) -> Vec<&ImportanceEntry> {
        self.ranked().into_iter().take(k).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalizes_and_ranks() {
        let imp = FeatureImportance::from_weights(
            &names(&["area_sqft", "bedrooms", "age_years"]),
            array![2.0, 1.0, 5.0],
        );
        assert!((imp.weights().iter().sum::<f64>() - 1.0).abs() < 1e-12);
        let top: Vec<&str> = imp.top_k(2).iter().map(|e| e.feature.as_str()).collect();
        assert_eq!(top, vec!["age_years", "area_sqft"]);
        assert_eq!(imp.get("bedrooms"), Some(0.125));
    }

    #[test]
    fn test_all_zero_is_uniform() {
        let imp = FeatureImportance::from_weights(&names(&["a", "b"]), array![0.0, 0.0]);
        assert_eq!(imp.weights(), vec![0.5, 0.5]);
    }
}
