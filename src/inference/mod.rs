//! Serving module
//!
//! - `Predictor`: validate, transform, predict and explain against one bundle
//! - `ActiveBundleHandle`: the bundle currently serving, swappable atomically
//! - `ValuationService`: predictions, what-if analysis and guarded retraining

mod predictor;
mod service;

pub use predictor::{ActiveBundleHandle, PredictionResult, Predictor};
pub use service::{
    summarize, AlwaysPromote, PerformanceSummary, PromotionDecision, PromotionPolicy, RegressionGuard,
    RetrainOutcome, ValuationService,
};
