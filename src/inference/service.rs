//! Long-lived valuation service: serving, what-if and guarded retraining

use super::predictor::{ActiveBundleHandle, PredictionResult, Predictor};
use crate::error::{PropvalError, Result};
use crate::explainability::ExplanationConfig;
use crate::export::{ModelBundle, ModelRegistry, ModelVersion, VersionSpec};
use crate::property::{Dataset, PropertyRecord, PropertySchema};
use crate::scenario::{ScenarioAnalyzer, ScenarioReport};
use crate::training::{
    CancellationToken, EvaluationScore, PerformanceBenchmark, TrainEngine, TrainingConfig,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of asking a policy whether a candidate bundle may go live
#[derive(Debug, Clone, PartialEq)]
pub enum PromotionDecision {
    Promote,
    Reject(String),
}

/// Decides whether a freshly trained bundle replaces the active one
pub trait PromotionPolicy: Send + Sync {
    fn decide(&self, active: &ModelBundle, candidate: &ModelBundle) -> PromotionDecision;
}

impl<P: PromotionPolicy + ?Sized> PromotionPolicy for Box<P> {
    fn decide(&self, active: &ModelBundle, candidate: &ModelBundle) -> PromotionDecision {
        (**self).decide(active, candidate)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysPromote;

impl PromotionPolicy for AlwaysPromote {
    fn decide(&self, _active: &ModelBundle, _candidate: &ModelBundle) -> PromotionDecision {
        PromotionDecision::Promote
    }
}

/// Rejects a candidate whose held-out RMSE is worse than the active
/// bundle's by more than `max_rmse_increase_ratio`
#[derive(Debug, Clone, Copy)]
pub struct RegressionGuard {
    pub max_rmse_increase_ratio: f64,
}

impl RegressionGuard {
    pub fn new(max_rmse_increase_ratio: f64) -> Self {
        Self {
            max_rmse_increase_ratio: max_rmse_increase_ratio.max(0.0),
        }
    }
}

impl PromotionPolicy for RegressionGuard {
    fn decide(&self, active: &ModelBundle, candidate: &ModelBundle) -> PromotionDecision {
        let Some(active_rmse) = active.selected_score().map(|s| s.test_rmse).filter(|v| v.is_finite()) else {
            return PromotionDecision::Promote;
        };
        let Some(candidate_rmse) = candidate.selected_score().map(|s| s.test_rmse).filter(|v| v.is_finite())
        else {
            return PromotionDecision::Reject("candidate has no finite held-out RMSE".to_string());
        };

        let limit = active_rmse * (1.0 + self.max_rmse_increase_ratio);
        if candidate_rmse > limit {
            PromotionDecision::Reject(format!(
                "test RMSE {:.2} exceeds {:.2} (active {:.2} + {:.0}%)",
                candidate_rmse,
                limit,
                active_rmse,
                self.max_rmse_increase_ratio * 100.0
            ))
        } else {
            PromotionDecision::Promote
        }
    }
}

/// Result of one retraining attempt that produced a bundle
#[derive(Debug, Clone)]
pub struct RetrainOutcome {
    pub version: ModelVersion,
    pub promoted: bool,
    pub rejection: Option<String>,
    pub benchmark: PerformanceBenchmark,
    pub elapsed_seconds: f64,
}

/// Snapshot of the active bundle's training metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub version: ModelVersion,
    pub model_name: String,
    pub selected: Option<EvaluationScore>,
    pub benchmark: Option<PerformanceBenchmark>,
    pub scores: BTreeMap<String, EvaluationScore>,
    pub n_features: usize,
    pub dataset_size: usize,
    pub trained_at: DateTime<Utc>,
    pub below_threshold: bool,
}

pub struct ValuationService {
    registry: Arc<dyn ModelRegistry>,
    active: ActiveBundleHandle,
    policy: Box<dyn PromotionPolicy>,
    training: Option<TrainingConfig>,
    explanation: Option<ExplanationConfig>,
    schema: PropertySchema,
    retrain_lock: Mutex<()>,
}

impl ValuationService {
    pub fn new(registry: Arc<dyn ModelRegistry>, active: Arc<ModelBundle>) -> Self {
        let schema = active.pipeline.schema().clone();
        Self {
            registry,
            active: ActiveBundleHandle::new(active),
            policy: Box::new(AlwaysPromote),
            training: None,
            explanation: None,
            schema,
            retrain_lock: Mutex::new(()),
        }
    }

    /// Serve the latest bundle in `registry`
    pub fn from_latest(registry: Arc<dyn ModelRegistry>) -> Result<Self> {
        let bundle = registry.load(&VersionSpec::Latest)?;
        info!(version = %bundle.version, model = %bundle.model_name, "Serving model bundle");
        Ok(Self::new(registry, bundle))
    }

    pub fn with_policy(mut self, policy: impl PromotionPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Training settings for retraining; defaults to the active bundle's own
    pub fn with_training_config(mut self, config: TrainingConfig) -> Self {
        self.training = Some(config);
        self
    }

    pub fn with_explanation(mut self, explanation: ExplanationConfig) -> Self {
        self.explanation = Some(explanation);
        self
    }

    pub fn active(&self) -> Arc<ModelBundle> {
        self.active.current()
    }

    pub fn registry(&self) -> &Arc<dyn ModelRegistry> {
        &self.registry
    }

    pub fn predictor(&self) -> Predictor {
        self.active.predictor()
    }

    pub fn predict(&self, record: &PropertyRecord) -> Result<PredictionResult> {
        self.predictor().predict(record)
    }

    pub fn what_if(&self, base: &PropertyRecord, scenarios: &[PropertyRecord]) -> Result<ScenarioReport> {
        ScenarioAnalyzer::new(self.predictor()).evaluate(base, scenarios)
    }

    pub fn retrain(&self, dataset: &Dataset) -> Result<RetrainOutcome> {
        self.retrain_with_cancellation(dataset, CancellationToken::new())
    }

    /// Train a new bundle and, if the policy accepts it, persist it and swap
    /// it in. Rejected bundles are discarded so the registry's latest version
    /// always matches what was last promoted.
    ///
    /// Any training error leaves the active bundle untouched.
    pub fn retrain_with_cancellation(&self, dataset: &Dataset, cancel: CancellationToken) -> Result<RetrainOutcome> {
        let _guard = self.retrain_lock.lock();
        let active = self.active.current();

        let config = self.training.clone().unwrap_or_else(|| active.config.clone());
        let explanation = self
            .explanation
            .clone()
            .unwrap_or_else(|| active.explanation.clone());
        let version = self.registry.next_version()?.max(active.version.bump_minor());

        let report = TrainEngine::new(config)
            .with_schema(self.schema.clone())
            .with_explanation(explanation)
            .with_cancellation(cancel)
            .train(dataset, version)
            .inspect_err(|e| warn!(version = %version, error = %e, "Retraining failed; active bundle unchanged"))?;

        let candidate = Arc::new(report.bundle);

        let decision = self.policy.decide(&active, &candidate);
        let (promoted, rejection) = match decision {
            PromotionDecision::Promote => {
                self.registry.save(&candidate)?;
                let previous = self.active.swap(Arc::clone(&candidate));
                info!(from = %previous.version, to = %candidate.version, "Promoted model bundle");
                (true, None)
            }
            PromotionDecision::Reject(reason) => {
                warn!(
                    candidate = %candidate.version,
                    active = %active.version,
                    reason = %reason,
                    "Promotion rejected"
                );
                (false, Some(reason))
            }
        };

        Ok(RetrainOutcome {
            version: candidate.version,
            promoted,
            rejection,
            benchmark: report.benchmark,
            elapsed_seconds: report.elapsed_seconds,
        })
    }

    pub fn performance_summary(&self) -> PerformanceSummary {
        summarize(&self.active.current())
    }

    /// Serve a specific stored version
    pub fn activate(&self, spec: &VersionSpec) -> Result<ModelVersion> {
        let bundle = self.registry.load(spec)?;
        if bundle.pipeline.schema() != &self.schema {
            return Err(PropvalError::Config(format!(
                "bundle {} was trained on a different schema",
                bundle.version
            )));
        }
        let version = bundle.version;
        let previous = self.active.swap(bundle);
        info!(from = %previous.version, to = %version, "Activated model bundle");
        Ok(version)
    }
}

/// Summary of any bundle's training metadata
pub fn summarize(bundle: &ModelBundle) -> PerformanceSummary {
    let selected = bundle.selected_score().cloned();
    PerformanceSummary {
        version: bundle.version,
        model_name: bundle.model_name.clone(),
        benchmark: selected.as_ref().map(PerformanceBenchmark::rate),
        selected,
        scores: bundle.scores.clone(),
        n_features: bundle.feature_names.len(),
        dataset_size: bundle.dataset_size,
        trained_at: bundle.trained_at,
        below_threshold: bundle.below_threshold(),
    }
}
