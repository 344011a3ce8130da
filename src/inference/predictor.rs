//! Serve path: validate, transform, predict, explain

use crate::error::Result;
use crate::explainability::{ConfidenceLabel, ExplanationEngine, FeatureImportance, PriceRange};
use crate::export::{ModelBundle, ModelVersion};
use crate::property::PropertyRecord;
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// Everything returned for a single valuation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_price: f64,
    pub price_range: PriceRange,
    pub confidence_score: f64,
    pub confidence_label: ConfidenceLabel,
    pub model_version: ModelVersion,
    pub model_name: String,
    pub feature_importance: FeatureImportance,
    pub narrative: String,
    pub prediction_id: Uuid,
    pub processing_time_ms: f64,
    /// Set when no candidate met the selection thresholds at training time
    pub below_threshold: bool,
}

/// Predicts against one immutable bundle
#[derive(Debug, Clone)]
pub struct Predictor {
    bundle: Arc<ModelBundle>,
    explainer: ExplanationEngine,
}

impl Predictor {
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        let explainer = ExplanationEngine::new(bundle.explanation.clone());
        Self { bundle, explainer }
    }

    pub fn bundle(&self) -> &Arc<ModelBundle> {
        &self.bundle
    }

    pub fn version(&self) -> ModelVersion {
        self.bundle.version
    }

    /// Validate and price one property
    pub fn predict(&self, record: &PropertyRecord) -> Result<PredictionResult> {
        let start = Instant::now();
        let bundle = &self.bundle;

        let features = bundle.pipeline.transform(record)?;
        let raw = bundle.model.predict_one(&features.values)?;
        // Linear extrapolation can dip below zero at the edges of the schema
        let predicted_price = if raw < 0.0 { 0.0 } else { raw };

        let (test_r2, test_rmse) = bundle
            .selected_score()
            .map(|s| (s.test_r2, s.test_rmse))
            .unwrap_or((0.0, f64::NAN));

        let explanation = self
            .explainer
            .explain(record, predicted_price, &bundle.static_importance, test_r2);
        let price_range = self.explainer.interval(predicted_price, test_rmse);

        let result = PredictionResult {
            predicted_price,
            price_range,
            confidence_score: explanation.confidence,
            confidence_label: explanation.label,
            model_version: bundle.version,
            model_name: bundle.model_name.clone(),
            feature_importance: bundle.static_importance.clone(),
            narrative: explanation.narrative,
            prediction_id: Uuid::new_v4(),
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            below_threshold: bundle.below_threshold(),
        };

        debug!(
            prediction_id = %result.prediction_id,
            version = %result.model_version,
            price = result.predicted_price,
            confidence = result.confidence_score,
            elapsed_ms = result.processing_time_ms,
            "Prediction complete"
        );
        Ok(result)
    }

    /// Price many properties in parallel; output order follows input order
    pub fn predict_batch(&self, records: &[PropertyRecord]) -> Vec<Result<PredictionResult>> {
        records.par_iter().map(|r| self.predict(r)).collect()
    }
}

/// Shared pointer to the bundle currently serving traffic.
///
/// Readers clone the `Arc` and release the lock before predicting, so a
/// prediction always sees exactly one bundle.
#[derive(Debug)]
pub struct ActiveBundleHandle {
    current: RwLock<Arc<ModelBundle>>,
}

impl ActiveBundleHandle {
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        Self {
            current: RwLock::new(bundle),
        }
    }

    pub fn current(&self) -> Arc<ModelBundle> {
        Arc::clone(&self.current.read())
    }

    pub fn predictor(&self) -> Predictor {
        Predictor::new(self.current())
    }

    /// Replace the active bundle, returning the previous one
    pub fn swap(&self, bundle: Arc<ModelBundle>) -> Arc<ModelBundle> {
        std::mem::replace(&mut *self.current.write(), bundle)
    }
}
