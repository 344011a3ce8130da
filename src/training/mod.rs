//! Model training module
//!
//! Provides the candidate regressors and the machinery around them:
//! - Ordinary least squares
//! - Bagged regression trees (random forest)
//! - Gradient boosted regression trees
//! - Seeded hold-out split and k-fold cross-validation
//! - Regression metrics and benchmark ratings
//! - Threshold-based model selection

mod config;
mod engine;
mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear_models;
pub mod random_forest;
pub mod selector;

pub use config::{BoostingParams, ForestParams, ModelType, SelectionThresholds, TrainingConfig};
pub use cross_validation::{train_test_split, CVSplit, KFold};
pub use decision_tree::{DecisionTree, TreeNode};
pub use engine::{CancellationToken, ModelTrainer, TrainEngine, TrainedModel, TrainerOutcome, TrainingReport};
pub use gradient_boosting::{GradientBoostingConfig, GradientBoostingRegressor};
pub use linear_models::LinearRegression;
pub use models::{EvaluationScore, PerformanceBenchmark, PerformanceRating, RegressionMetrics};
pub use random_forest::RandomForest;
pub use selector::{ModelSelector, Selection, SelectionReason};

pub(crate) use engine::normalize_importance;
