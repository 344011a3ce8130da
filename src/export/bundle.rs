//! The persisted unit of a training run

use super::versioning::ModelVersion;
use crate::explainability::{ExplanationConfig, FeatureImportance};
use crate::preprocessing::FittedPipeline;
use crate::training::{EvaluationScore, Selection, TrainedModel, TrainingConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fitted pipeline, selected model, per-candidate scores and metadata.
///
/// Immutable once built. Loading a bundle on its own is enough to serve
/// predictions: no other training artifact is consulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub version: ModelVersion,
    pub model_name: String,
    pub pipeline: FittedPipeline,
    pub model: TrainedModel,
    /// Scores of every candidate that trained successfully, keyed by model name
    pub scores: BTreeMap<String, EvaluationScore>,
    pub static_importance: FeatureImportance,
    pub feature_names: Vec<String>,
    pub trained_at: DateTime<Utc>,
    pub config: TrainingConfig,
    pub explanation: ExplanationConfig,
    pub selection: Selection,
    pub dataset_size: usize,
}

impl ModelBundle {
    /// Held-out scores of the selected model
    pub fn selected_score(&self) -> Option<&EvaluationScore> {
        self.scores.get(&self.model_name)
    }

    pub fn below_threshold(&self) -> bool {
        self.selection.below_threshold
    }
}
