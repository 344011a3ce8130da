//! Threshold-based model selection with a below-threshold fallback

use super::config::SelectionThresholds;
use super::engine::TrainedModel;
use super::models::EvaluationScore;
use crate::error::{PropvalError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Why a candidate was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
    /// Lowest held-out RMSE among candidates meeting both thresholds
    BestEligible,
    /// No candidate met the thresholds; highest held-out R² overall
    BelowThreshold,
}

/// Outcome of model selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub model_name: String,
    pub reason: SelectionReason,
    pub below_threshold: bool,
    /// Names of candidates that met both thresholds
    pub eligible: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelSelector {
    thresholds: SelectionThresholds,
}

impl ModelSelector {
    pub fn new(thresholds: SelectionThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> SelectionThresholds {
        self.thresholds
    }

    /// Whether a score meets both thresholds. NaN never qualifies.
    pub fn is_eligible(&self, score: &EvaluationScore) -> bool {
        score.is_finite()
            && score.test_r2 >= self.thresholds.min_r2
            && score.test_rmse <= self.thresholds.max_rmse
    }

    /// Choose a candidate name from scores alone
    pub fn select_from_scores(&self, scores: &BTreeMap<String, EvaluationScore>) -> Result<Selection> {
        if scores.is_empty() {
            return Err(PropvalError::TrainingFailure("no candidate scores to select from".to_string()));
        }

        let eligible: Vec<(&String, &EvaluationScore)> =
            scores.iter().filter(|(_, s)| self.is_eligible(s)).collect();
        let eligible_names: Vec<String> = eligible.iter().map(|(n, _)| (*n).clone()).collect();

        // BTreeMap iteration is name-ordered, so min_by/max_by keep the first name on full ties
        if let Some((name, score)) = eligible.into_iter().min_by(|a, b| rank_eligible(a, b)) {
            info!(
                model = %name,
                test_rmse = score.test_rmse,
                test_r2 = score.test_r2,
                "Selected best eligible candidate"
            );
            return Ok(Selection {
                model_name: name.clone(),
                reason: SelectionReason::BestEligible,
                below_threshold: false,
                eligible: eligible_names,
            });
        }

        let (name, score) = scores
            .iter()
            .filter(|(_, s)| s.test_r2.is_finite())
            .min_by(|a, b| rank_fallback(a, b))
            .ok_or_else(|| {
                PropvalError::TrainingFailure("every candidate has a non-finite held-out R²".to_string())
            })?;

        warn!(
            model = %name,
            test_rmse = score.test_rmse,
            test_r2 = score.test_r2,
            min_r2 = self.thresholds.min_r2,
            max_rmse = self.thresholds.max_rmse,
            "No candidate met the selection thresholds, falling back to highest R²"
        );
        Ok(Selection {
            model_name: name.clone(),
            reason: SelectionReason::BelowThreshold,
            below_threshold: true,
            eligible: eligible_names,
        })
    }

    /// Choose a candidate and take ownership of its model
    pub fn select(
        &self,
        mut candidates: BTreeMap<String, TrainedModel>,
        scores: &BTreeMap<String, EvaluationScore>,
    ) -> Result<(Selection, TrainedModel)> {
        let selection = self.select_from_scores(scores)?;
        let model = candidates.remove(&selection.model_name).ok_or_else(|| {
            PropvalError::TrainingFailure(format!(
                "selected candidate {} has no trained model",
                selection.model_name
            ))
        })?;
        Ok((selection, model))
    }
}

/// Lowest RMSE, then highest R², then name
fn rank_eligible(a: &(&String, &EvaluationScore), b: &(&String, &EvaluationScore)) -> Ordering {
    a.1.test_rmse
        .total_cmp(&b.1.test_rmse)
        .then_with(|| b.1.test_r2.total_cmp(&a.1.test_r2))
        .then_with(|| a.0.cmp(b.0))
}

/// Highest R², then lowest RMSE, then name
fn rank_fallback(a: &(&String, &EvaluationScore), b: &(&String, &EvaluationScore)) -> Ordering {
    b.1.test_r2
        .total_cmp(&a.1.test_r2)
        .then_with(|| a.1.test_rmse.total_cmp(&b.1.test_rmse))
        .then_with(|| a.0.cmp(b.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(r2: f64, rmse: f64) -> EvaluationScore {
        EvaluationScore {
            train_rmse: rmse,
            test_rmse: rmse,
            train_r2: r2,
            test_r2: r2,
            test_mae: rmse,
            train_size: 80,
            test_size: 20,
            cv_rmse_mean: None,
            cv_rmse_std: None,
            cv_r2_mean: None,
            fit_seconds: 0.0,
        }
    }

    fn scores(entries: &[(&str, f64, f64)]) -> BTreeMap<String, EvaluationScore> {
        entries
            .iter()
            .map(|(n, r2, rmse)| (n.to_string(), score(*r2, *rmse)))
            .collect()
    }

    #[test]
    fn test_rmse_threshold_excludes() {
        let s = scores(&[("a", 0.75, 40_000.0), ("b", 0.72, 55_000.0)]);
        let sel = ModelSelector::default().select_from_scores(&s).unwrap();
        assert_eq!(sel.model_name, "a");
        assert_eq!(sel.reason, SelectionReason::BestEligible);
        assert!(!sel.below_threshold);
        assert_eq!(sel.eligible, vec!["a".to_string()]);
    }

    #[test]
    fn test_fallback_highest_r2() {
        let s = scores(&[("a", 0.5, 60_000.0), ("b", 0.6, 70_000.0)]);
        let sel = ModelSelector::default().select_from_scores(&s).unwrap();
        assert_eq!(sel.model_name, "b");
        assert_eq!(sel.reason, SelectionReason::BelowThreshold);
        assert!(sel.below_threshold);
    }

    #[test]
    fn test_tie_breaks() {
        let s = scores(&[("b", 0.80, 30_000.0), ("a", 0.85, 30_000.0), ("c", 0.85, 30_000.0)]);
        let sel = ModelSelector::default().select_from_scores(&s).unwrap();
        assert_eq!(sel.model_name, "a");
    }

    #[test]
    fn test_nan_never_eligible() {
        let s = scores(&[("a", f64::NAN, 10_000.0), ("b", 0.71, 49_000.0)]);
        let sel = ModelSelector::default().select_from_scores(&s).unwrap();
        assert_eq!(sel.model_name, "b");

        let all_nan = scores(&[("a", f64::NAN, f64::NAN)]);
        assert!(ModelSelector::default().select_from_scores(&all_nan).is_err());
    }

    #[test]
    fn test_empty_scores_fail() {
        let result = ModelSelector::default().select_from_scores(&BTreeMap::new());
        assert!(matches!(result, Err(PropvalError::TrainingFailure(_))));
    }

    #[test]
    fn test_missing_candidate_fails() {
        let s = scores(&[("a", 0.9, 10_000.0)]);
        let result = ModelSelector::default().select(BTreeMap::new(), &s);
        assert!(matches!(result, Err(PropvalError::TrainingFailure(_))));
    }
}
