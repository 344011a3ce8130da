//! Regression metrics, per-candidate evaluation scores and benchmark ratings

use crate::preprocessing::median;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metrics for one set of predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    /// Mean of `actual - predicted`
    pub mean_error: f64,
    pub median_error: f64,
    pub error_std: f64,
    pub max_abs_error: f64,
    /// Mean absolute percentage error over rows with a non-zero target
    pub mape: Option<f64>,
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute regression metrics. Empty inputs yield NaN scores.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n_samples = y_true.len().min(y_pred.len());
        if n_samples == 0 {
            return Self {
                mse: f64::NAN,
                rmse: f64::NAN,
                mae: f64::NAN,
                r2: f64::NAN,
                mean_error: f64::NAN,
                median_error: f64::NAN,
                error_std: f64::NAN,
                max_abs_error: f64::NAN,
                mape: None,
                n_samples,
            };
        }

        let n = n_samples as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
        let mean_error = errors.iter().sum::<f64>() / n;
        let error_std = (errors.iter().map(|e| (e - mean_error).powi(2)).sum::<f64>() / n).sqrt();
        let max_abs_error = errors.iter().fold(0.0_f64, |m, e| m.max(e.abs()));

        let y_mean = y_true.iter().take(n_samples).sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().take(n_samples).map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

        let pct: Vec<f64> = y_true
            .iter()
            .zip(errors.iter())
            .filter(|(t, _)| **t != 0.0)
            .map(|(t, e)| (e / t).abs() * 100.0)
            .collect();
        let mape = if pct.is_empty() {
            None
        } else {
            Some(pct.iter().sum::<f64>() / pct.len() as f64)
        };

        Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2,
            mean_error,
            median_error: median(&errors),
            error_std,
            max_abs_error,
            mape,
            n_samples,
        }
    }
}

/// Evaluation of one trained candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationScore {
    pub train_rmse: f64,
    pub test_rmse: f64,
    pub train_r2: f64,
    pub test_r2: f64,
    pub test_mae: f64,
    pub train_size: usize,
    pub test_size: usize,
    /// Mean fold RMSE over the training split, `None` when CV is disabled
    pub cv_rmse_mean: Option<f64>,
    pub cv_rmse_std: Option<f64>,
    pub cv_r2_mean: Option<f64>,
    pub fit_seconds: f64,
}

impl EvaluationScore {
    /// Build from train and held-out metrics
    pub fn from_metrics(train: &RegressionMetrics, test: &RegressionMetrics, fit_seconds: f64) -> Self {
        Self {
            train_rmse: train.rmse,
            test_rmse: test.rmse,
            train_r2: train.r2,
            test_r2: test.r2,
            test_mae: test.mae,
            train_size: train.n_samples,
            test_size: test.n_samples,
            cv_rmse_mean: None,
            cv_rmse_std: None,
            cv_r2_mean: None,
            fit_seconds,
        }
    }

    /// Attach fold-level results
    pub fn with_cv(mut self, fold_rmse: &[f64], fold_r2: &[f64]) -> Self {
        if fold_rmse.is_empty() {
            return self;
        }
        let k = fold_rmse.len() as f64;
        let mean = fold_rmse.iter().sum::<f64>() / k;
        let std = (fold_rmse.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / k).sqrt();
        self.cv_rmse_mean = Some(mean);
        self.cv_rmse_std = Some(std);
        self.cv_r2_mean = Some(fold_r2.iter().sum::<f64>() / fold_r2.len().max(1) as f64);
        self
    }

    /// Whether the held-out scores are usable for comparison
    pub fn is_finite(&self) -> bool {
        self.test_rmse.is_finite() && self.test_r2.is_finite()
    }
}

/// Coarse quality bucket for one metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceRating {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl fmt::Display for PerformanceRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PerformanceRating::Excellent => "excellent",
            PerformanceRating::Good => "good",
            PerformanceRating::Acceptable => "acceptable",
            PerformanceRating::Poor => "poor",
        };
        f.write_str(s)
    }
}

/// Ratings of the held-out RMSE, R² and MAE against industry benchmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceBenchmark {
    pub rmse: PerformanceRating,
    pub r2: PerformanceRating,
    pub mae: PerformanceRating,
}

impl PerformanceBenchmark {
    const RMSE: [f64; 3] = [30_000.0, 50_000.0, 80_000.0];
    const R2: [f64; 3] = [0.9, 0.8, 0.7];
    const MAE: [f64; 3] = [20_000.0, 35_000.0, 50_000.0];

    pub fn rate(score: &EvaluationScore) -> Self {
        Self {
            rmse: lower_is_better(score.test_rmse, Self::RMSE),
            r2: higher_is_better(score.test_r2, Self::R2),
            mae: lower_is_better(score.test_mae, Self::MAE),
        }
    }
}

fn lower_is_better(value: f64, [excellent, good, acceptable]: [f64; 3]) -> PerformanceRating {
    if value <= excellent {
        PerformanceRating::Excellent
    } else if value <= good {
        PerformanceRating::Good
    } else if value <= acceptable {
        PerformanceRating::Acceptable
    } else {
        PerformanceRating::Poor
    }
}

fn higher_is_better(value: f64, [excellent, good, acceptable]: [f64; 3]) -> PerformanceRating {
    if value >= excellent {
        PerformanceRating::Excellent
    } else if value >= good {
        PerformanceRating::Good
    } else if value >= acceptable {
        PerformanceRating::Acceptable
    } else {
        PerformanceRating::Poor
    }
}
