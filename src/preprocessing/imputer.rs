//! Missing value imputation

use crate::error::{PropvalError, Result};
use serde::{Deserialize, Serialize};

/// Strategy for imputing missing numeric values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with the fit-time median
    Median,
    /// Replace with the fit-time mean
    Mean,
}

/// Per-column imputer whose fill values are frozen at fit time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Vec<f64>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit one fill value per column.
    ///
    /// `columns[j]` holds the observed values of column `j` (missing entries
    /// already removed). An empty column falls back to `fallbacks[j]`.
    pub fn fit(&mut self, columns: &[Vec<f64>], fallbacks: &[f64]) -> Result<&mut Self> {
        if columns.len() != fallbacks.len() {
            return Err(PropvalError::ShapeError {
                expected: format!("{} fallbacks", columns.len()),
                actual: format!("{} fallbacks", fallbacks.len()),
            });
        }

        self.fill_values = columns
            .iter()
            .zip(fallbacks)
            .map(|(values, &fallback)| {
                if values.is_empty() {
                    return fallback;
                }
                match self.strategy {
                    ImputeStrategy::Median => median(values),
                    ImputeStrategy::Mean => values.iter().sum::<f64>() / values.len() as f64,
                }
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Fill a possibly missing value of column `idx`
    pub fn fill(&self, idx: usize, value: Option<f64>) -> Result<f64> {
        if !self.is_fitted {
            return Err(PropvalError::ModelNotFitted);
        }
        match value {
            Some(v) => Ok(v),
            None => self
                .fill_values
                .get(idx)
                .copied()
                .ok_or_else(|| PropvalError::Computation(format!("no imputer for column {}", idx))),
        }
    }

    pub fn fill_values(&self) -> &[f64] {
        &self.fill_values
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

/// Median of a non-empty slice, averaging the two middle values for even lengths
pub(crate) fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_imputation() {
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        imputer
            .fit(&[vec![1.0, 5.0, 3.0], vec![2.0, 4.0]], &[0.0, 0.0])
            .unwrap();

        assert_eq!(imputer.fill_values(), &[3.0, 3.0]);
        assert_eq!(imputer.fill(0, None).unwrap(), 3.0);
        assert_eq!(imputer.fill(0, Some(7.0)).unwrap(), 7.0);
    }

    #[test]
    fn test_empty_column_uses_fallback() {
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        imputer.fit(&[vec![]], &[5.0]).unwrap();
        assert_eq!(imputer.fill(0, None).unwrap(), 5.0);
    }

    #[test]
    fn test_unfitted_errors() {
        let imputer = Imputer::new(ImputeStrategy::Mean);
        assert!(matches!(imputer.fill(0, None), Err(PropvalError::ModelNotFitted)));
    }
}
