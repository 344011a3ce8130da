//! Feature preprocessing
//!
//! Turns validated property records into fixed-length numeric vectors:
//! - Median imputation of missing numeric values
//! - Standard scaling with fit-time statistics
//! - One-hot encoding with a dropped reference category

mod config;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use config::PreprocessingConfig;
pub use encoder::{OneHotEncoder, MISSING_CATEGORY};
pub use imputer::{ImputeStrategy, Imputer};
pub use pipeline::{FeaturePipeline, FeatureVector, FittedPipeline, NumericStats};
pub use scaler::{Scaler, ScalerParams, ScalerType};

pub(crate) use imputer::median;
