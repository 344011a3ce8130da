//! propval - Explainable property price prediction
//!
//! This crate predicts a property's market price from structured attributes
//! and explains the result:
//! - Schema validation of property records
//! - Feature pipeline (imputation, scaling, one-hot encoding)
//! - Multi-model training with cross-validation and threshold-based selection
//! - Confidence, price interval and natural-language rationale per prediction
//! - What-if scenario comparison
//! - Versioned bundle registries and a hot-swappable serving handle
//!
//! # Modules
//!
//! - [`property`] - Records, datasets and the housing schema
//! - [`preprocessing`] - Fitted feature pipeline
//! - [`training`] - Candidate regressors, evaluation and selection
//! - [`explainability`] - Importance, confidence, narrative, interval
//! - [`scenario`] - What-if analysis
//! - [`export`] - Bundles, versions and registries
//! - [`inference`] - Predictor, active bundle handle, valuation service
//! - [`synthetic`] - Synthetic housing data
//! - [`utils`] - CSV dataset loading
//! - [`config`] - JSON application config
//! - [`cli`] - Command-line interface

pub mod error;

pub mod property;
pub mod preprocessing;
pub mod training;
pub mod explainability;
pub mod scenario;
pub mod export;
pub mod inference;

pub mod synthetic;
pub mod utils;
pub mod config;
pub mod cli;

pub use error::{PropvalError, Result};

use std::sync::Arc;

/// Train with the housing schema and default explanation settings,
/// tagging the bundle as version 1.0.0
pub fn train(
    dataset: &property::Dataset,
    config: &training::TrainingConfig,
) -> Result<training::TrainingReport> {
    training::TrainEngine::new(config.clone()).train(dataset, export::ModelVersion::default())
}

/// Price one property against a loaded bundle
pub fn predict(
    bundle: &Arc<export::ModelBundle>,
    record: &property::PropertyRecord,
) -> Result<inference::PredictionResult> {
    inference::Predictor::new(Arc::clone(bundle)).predict(record)
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{PropvalError, Result};

    pub use crate::property::{Dataset, FieldValue, PropertyRecord, PropertySchema};

    pub use crate::preprocessing::{FeaturePipeline, FittedPipeline, PreprocessingConfig};

    pub use crate::training::{
        CancellationToken, EvaluationScore, ModelType, Selection, TrainEngine, TrainingConfig, TrainingReport,
    };

    pub use crate::explainability::{ConfidenceLabel, ExplanationConfig, FeatureImportance, PriceRange};

    pub use crate::scenario::{ScenarioAnalyzer, ScenarioReport};

    pub use crate::export::{FsModelRegistry, InMemoryModelRegistry, ModelBundle, ModelRegistry, ModelVersion, VersionSpec};

    pub use crate::inference::{
        ActiveBundleHandle, PredictionResult, Predictor, PromotionPolicy, RegressionGuard, ValuationService,
    };

    pub use crate::synthetic::SyntheticHousingGenerator;

    pub use crate::config::AppConfig;
}
