//! Ordinary least squares regression

use crate::error::{PropvalError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Relative threshold below which a centered column counts as constant
const CONSTANT_COLUMN_EPS: f64 = 1e-12;

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Retries once with a tiny ridge on the diagonal if the matrix is not PD.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    cholesky_factor(a).or_else(|| {
        let ridge = 1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
        let mut a_reg = a.clone();
        for k in 0..n {
            a_reg[[k, k]] += ridge;
        }
        cholesky_factor(&a_reg)
    })
    .map(|l| {
        // Forward substitution: L * y = b
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..i {
                sum += l[[i, j]] * y[j];
            }
            y[i] = (b[i] - sum) / l[[i, i]];
        }

        // Backward substitution: L^T * x = y
        let mut x = Array1::zeros(n);
        for i in (0..n).rev() {
            let mut sum = 0.0;
            for j in (i + 1)..n {
                sum += l[[j, i]] * x[j];
            }
            x[i] = (y[i] - sum) / l[[i, i]];
        }
        x
    })
}

/// Lower-triangular L with A = L * L^T, or `None` if A is not positive definite
fn cholesky_factor(a: &Array2<f64>) -> Option<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    Some(l)
}

/// Matrix inversion using Gauss-Jordan elimination with partial pivoting (fallback)
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    // Augmented matrix [M | I]
    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }

        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Solve least squares via normal equations: (X^T X) w = X^T y.
/// Cholesky first, Gauss-Jordan inverse as fallback.
fn solve_least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Option<Array1<f64>> {
    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);

    cholesky_solve(&xtx, &xty).or_else(|| matrix_inverse(&xtx).map(|inv| inv.dot(&xty)))
}

/// Linear regression with intercept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: f64,
    /// Whether model is fitted
    pub is_fitted: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    /// Create a new linear regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            is_fitted: false,
        }
    }

    /// Fit the model to training data.
    ///
    /// Constant columns (e.g. a dummy whose category never occurs) get a zero
    /// coefficient and are left out of the solve.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PropvalError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        let x_mean = x.mean_axis(Axis(0)).ok_or_else(|| {
            PropvalError::TrainingFailure("linear regression needs at least one sample".to_string())
        })?;
        let y_mean = y.mean().unwrap_or(0.0);

        let x_centered = x - &x_mean.view().insert_axis(Axis(0));
        let y_centered = y - y_mean;

        let col_ss: Vec<f64> = x_centered
            .axis_iter(Axis(1))
            .map(|c| c.dot(&c))
            .collect();
        let scale = col_ss.iter().cloned().fold(1.0_f64, f64::max);
        let active: Vec<usize> = (0..n_features)
            .filter(|&j| col_ss[j] > CONSTANT_COLUMN_EPS * scale)
            .collect();

        let mut coefficients = Array1::zeros(n_features);
        if !active.is_empty() {
            let x_active = x_centered.select(Axis(1), &active);
            let solved = solve_least_squares(&x_active, &y_centered).ok_or_else(|| {
                PropvalError::Computation("Matrix is singular, cannot solve least squares".to_string())
            })?;
            for (&j, &w) in active.iter().zip(solved.iter()) {
                coefficients[j] = w;
            }
        }

        if coefficients.iter().any(|w: &f64| !w.is_finite()) {
            return Err(PropvalError::Computation(
                "least squares produced non-finite coefficients".to_string(),
            ));
        }

        self.intercept = y_mean - coefficients.dot(&x_mean);
        self.coefficients = Some(coefficients);
        self.is_fitted = true;

        Ok(self)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(PropvalError::ModelNotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(PropvalError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(coefficients) + self.intercept)
    }

    /// Normalized |coefficient| importances
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        let abs = self.coefficients.as_ref()?.mapv(f64::abs);
        let total = abs.sum();
        Some(if total > 0.0 { abs / total } else { abs })
    }
}
