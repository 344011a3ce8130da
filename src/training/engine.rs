//! Training engine: candidate fitting, evaluation and bundle assembly

use super::config::{ModelType, TrainingConfig};
use super::cross_validation::{train_test_split, KFold};
use super::gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
use super::linear_models::LinearRegression;
use super::models::{EvaluationScore, PerformanceBenchmark, RegressionMetrics};
use super::random_forest::RandomForest;
use super::selector::{ModelSelector, Selection};
use crate::error::{PropvalError, Result};
use crate::explainability::{ExplanationConfig, FeatureImportance};
use crate::export::{ModelBundle, ModelVersion};
use crate::preprocessing::FeaturePipeline;
use crate::property::{Dataset, PropertyRecord, PropertySchema};
use chrono::Utc;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A fitted estimator of one of the candidate families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    Linear(LinearRegression),
    BaggedTrees(RandomForest),
    BoostedTrees(GradientBoostingRegressor),
}

impl TrainedModel {
    pub fn model_type(&self) -> ModelType {
        match self {
            TrainedModel::Linear(_) => ModelType::LinearRegression,
            TrainedModel::BaggedTrees(_) => ModelType::RandomForest,
            TrainedModel::BoostedTrees(_) => ModelType::GradientBoosting,
        }
    }

    pub fn name(&self) -> &'static str {
        self.model_type().name()
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::Linear(m) => m.predict(x),
            TrainedModel::BaggedTrees(m) => m.predict(x),
            TrainedModel::BoostedTrees(m) => m.predict(x),
        }
    }

    /// Predict a single feature row
    pub fn predict_one(&self, features: &[f64]) -> Result<f64> {
        let x = Array2::from_shape_vec((1, features.len()), features.to_vec())?;
        let pred = self.predict(&x)?;
        pred.first().copied().ok_or(PropvalError::ModelNotFitted)
    }

    /// Per-feature importance normalized to sum to 1.0.
    ///
    /// An all-zero or non-finite signal becomes uniform weights.
    pub fn importance(&self) -> Array1<f64> {
        let raw: Option<Array1<f64>> = match self {
            TrainedModel::Linear(m) => m.feature_importances(),
            TrainedModel::BaggedTrees(m) => m.feature_importances().cloned(),
            TrainedModel::BoostedTrees(m) => Some(Array1::from(m.feature_importances().to_vec())),
        };
        normalize_importance(raw.unwrap_or_else(|| Array1::zeros(0)))
    }
}

pub(crate) fn normalize_importance(raw: Array1<f64>) -> Array1<f64> {
    let n = raw.len();
    if n == 0 {
        return raw;
    }
    let cleaned = raw.mapv(|v| if v.is_finite() { v.abs() } else { 0.0 });
    let total = cleaned.sum();
    if total > 0.0 {
        cleaned / total
    } else {
        Array1::from_elem(n, 1.0 / n as f64)
    }
}

/// Cooperative cancellation flag shared with a running training call
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Every successfully trained candidate with its evaluation
#[derive(Debug, Clone)]
pub struct TrainerOutcome {
    pub models: BTreeMap<String, TrainedModel>,
    pub scores: BTreeMap<String, EvaluationScore>,
}

/// Fits the configured candidate families on one split
pub struct ModelTrainer {
    config: TrainingConfig,
    cancel: CancellationToken,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Split, fit every candidate in parallel and score it.
    ///
    /// Cancellation and the deadline are checked before each candidate starts.
    /// A failing candidate is dropped; if all fail the call fails.
    pub fn train(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<TrainerOutcome> {
        self.config.validate()?;
        let start = Instant::now();
        let deadline = self.config.timeout_secs.map(|s| start + Duration::from_secs(s));

        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(PropvalError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples < self.config.min_training_rows {
            return Err(PropvalError::TrainingFailure(format!(
                "need at least {} rows, got {}",
                self.config.min_training_rows, n_samples
            )));
        }

        let (train_idx, test_idx) =
            train_test_split(n_samples, self.config.test_size, self.config.random_state)?;
        let x_train = x.select(Axis(0), &train_idx);
        let y_train = y.select(Axis(0), &train_idx);
        let x_test = x.select(Axis(0), &test_idx);
        let y_test = y.select(Axis(0), &test_idx);

        info!(
            train_rows = train_idx.len(),
            test_rows = test_idx.len(),
            features = x.ncols(),
            candidates = self.config.candidates.len(),
            "Training candidates"
        );

        let results: Vec<(ModelType, Result<(TrainedModel, EvaluationScore)>)> = self
            .config
            .candidates
            .par_iter()
            .map(|&kind| {
                let result = self.check_budget(deadline).and_then(|_| {
                    self.fit_and_score(kind, &x_train, &y_train, &x_test, &y_test)
                });
                (kind, result)
            })
            .collect();

        let mut models = BTreeMap::new();
        let mut scores = BTreeMap::new();
        for (kind, result) in results {
            match result {
                Ok((model, score)) => {
                    info!(
                        candidate = %kind,
                        test_rmse = score.test_rmse,
                        test_r2 = score.test_r2,
                        fit_seconds = score.fit_seconds,
                        "Candidate trained"
                    );
                    scores.insert(kind.name().to_string(), score);
                    models.insert(kind.name().to_string(), model);
                }
                Err(e @ (PropvalError::Cancelled | PropvalError::Timeout { .. })) => return Err(e),
                Err(e) => warn!(candidate = %kind, error = %e, "Candidate failed, dropping it"),
            }
        }

        if models.is_empty() {
            return Err(PropvalError::TrainingFailure(
                "every candidate model failed to train".to_string(),
            ));
        }

        debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Candidate training finished");
        Ok(TrainerOutcome { models, scores })
    }

    fn check_budget(&self, deadline: Option<Instant>) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(PropvalError::Cancelled);
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Err(PropvalError::Timeout {
                    limit_secs: self.config.timeout_secs.unwrap_or(0),
                });
            }
        }
        Ok(())
    }

    fn fit_and_score(
        &self,
        kind: ModelType,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<(TrainedModel, EvaluationScore)> {
        let start = Instant::now();
        let model = self.fit_candidate(kind, x_train, y_train)?;
        let fit_seconds = start.elapsed().as_secs_f64();

        let train_metrics = RegressionMetrics::compute(y_train, &model.predict(x_train)?);
        let test_metrics = RegressionMetrics::compute(y_test, &model.predict(x_test)?);
        let score = EvaluationScore::from_metrics(&train_metrics, &test_metrics, fit_seconds);

        let (fold_rmse, fold_r2) = self.cross_validate(kind, x_train, y_train)?;
        Ok((model, score.with_cv(&fold_rmse, &fold_r2)))
    }

    /// Fold RMSE and R² over the training split; empty when CV is off
    fn cross_validate(
        &self,
        kind: ModelType,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let folds = self.config.cv_folds;
        if folds < 2 {
            return Ok((Vec::new(), Vec::new()));
        }
        if x.nrows() < folds {
            debug!(candidate = %kind, rows = x.nrows(), folds, "Too few rows for cross-validation");
            return Ok((Vec::new(), Vec::new()));
        }

        let splits = KFold::new(folds)
            .with_random_state(self.config.random_state)
            .split(x.nrows())?;

        let mut rmse = Vec::with_capacity(folds);
        let mut r2 = Vec::with_capacity(folds);
        for split in splits {
            let model = self.fit_candidate(
                kind,
                &x.select(Axis(0), &split.train_indices),
                &y.select(Axis(0), &split.train_indices),
            )?;
            let y_fold = y.select(Axis(0), &split.test_indices);
            let pred = model.predict(&x.select(Axis(0), &split.test_indices))?;
            let metrics = RegressionMetrics::compute(&y_fold, &pred);
            rmse.push(metrics.rmse);
            r2.push(metrics.r2);
        }

        Ok((rmse, r2))
    }

    fn fit_candidate(&self, kind: ModelType, x: &Array2<f64>, y: &Array1<f64>) -> Result<TrainedModel> {
        let seed = self.config.random_state;
        match kind {
            ModelType::LinearRegression => {
                let mut model = LinearRegression::new();
                model.fit(x, y)?;
                Ok(TrainedModel::Linear(model))
            }
            ModelType::RandomForest => {
                let params = &self.config.forest;
                let mut model = RandomForest::new(params.n_estimators)
                    .with_min_samples_split(params.min_samples_split)
                    .with_min_samples_leaf(params.min_samples_leaf)
                    .with_random_state(seed);
                if let Some(depth) = params.max_depth {
                    model = model.with_max_depth(depth);
                }
                model.fit(x, y)?;
                Ok(TrainedModel::BaggedTrees(model))
            }
            ModelType::GradientBoosting => {
                let params = &self.config.boosting;
                let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
                    n_estimators: params.n_estimators,
                    learning_rate: params.learning_rate,
                    max_depth: params.max_depth,
                    min_samples_leaf: params.min_samples_leaf,
                    subsample: params.subsample,
                    random_state: seed,
                });
                model.fit(x, y)?;
                Ok(TrainedModel::BoostedTrees(model))
            }
        }
    }
}

/// Result of a full training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub bundle: ModelBundle,
    /// Benchmark ratings of the selected candidate's held-out scores
    pub benchmark: PerformanceBenchmark,
    pub elapsed_seconds: f64,
}

impl TrainingReport {
    pub fn selection(&self) -> &Selection {
        &self.bundle.selection
    }
}

/// End-to-end training: pipeline fit, candidate training, selection, bundle
pub struct TrainEngine {
    config: TrainingConfig,
    explanation: ExplanationConfig,
    schema: PropertySchema,
    cancel: CancellationToken,
}

impl TrainEngine {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            explanation: ExplanationConfig::default(),
            schema: PropertySchema::housing(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_schema(mut self, schema: PropertySchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_explanation(mut self, explanation: ExplanationConfig) -> Self {
        self.explanation = explanation;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train on `dataset` and assemble a bundle tagged with `version`
    pub fn train(&self, dataset: &Dataset, version: ModelVersion) -> Result<TrainingReport> {
        let start = Instant::now();
        self.config.validate()?;
        self.explanation.validate()?;

        if dataset.len() < self.config.min_training_rows {
            return Err(PropvalError::TrainingFailure(format!(
                "need at least {} rows, got {}",
                self.config.min_training_rows,
                dataset.len()
            )));
        }
        for row in &dataset.rows {
            if !row.price.is_finite() || row.price < 0.0 {
                return Err(PropvalError::validation("price", row.price, "finite non-negative number"));
            }
        }

        let records: Vec<&PropertyRecord> = dataset.records();
        let pipeline = FeaturePipeline::with_config(self.config.preprocessing.clone())
            .fit(&self.schema, &records)?;
        let x = pipeline.transform_batch(&records)?;
        let y = Array1::from(dataset.prices());

        let outcome = ModelTrainer::new(self.config.clone())
            .with_cancellation(self.cancel.clone())
            .train(&x, &y)?;

        let selector = ModelSelector::new(self.config.thresholds);
        let (selection, model) = selector.select(outcome.models, &outcome.scores)?;

        let feature_names: Vec<String> = pipeline.feature_names().to_vec();
        let static_importance = FeatureImportance::from_model(&model, &feature_names)?;

        let benchmark = outcome
            .scores
            .get(&selection.model_name)
            .map(PerformanceBenchmark::rate)
            .ok_or_else(|| PropvalError::TrainingFailure("selected candidate has no score".to_string()))?;

        info!(
            version = %version,
            model = %selection.model_name,
            below_threshold = selection.below_threshold,
            rows = dataset.len(),
            "Training complete"
        );

        let bundle = ModelBundle {
            version,
            model_name: selection.model_name.clone(),
            pipeline,
            model,
            scores: outcome.scores,
            static_importance,
            feature_names,
            trained_at: Utc::now(),
            config: self.config.clone(),
            explanation: self.explanation.clone(),
            selection,
            dataset_size: dataset.len(),
        };

        Ok(TrainingReport {
            bundle,
            benchmark,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        })
    }
}
