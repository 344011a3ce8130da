//! Feature scaling

use crate::error::{PropvalError, Result};
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// No scaling
    None,
}

/// Parameters for one fitted column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// mean
    pub center: f64,
    /// population std, 1.0 when degenerate
    pub scale: f64,
}

impl ScalerParams {
    const IDENTITY: ScalerParams = ScalerParams {
        center: 0.0,
        scale: 1.0,
    };
}

/// Column-wise feature scaler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit one set of parameters per column.
    /// Sums run sequentially in row order so refits are bit-identical.
    pub fn fit(&mut self, columns: &[Vec<f64>]) -> Result<&mut Self> {
        self.params = columns
            .iter()
            .map(|values| match self.scaler_type {
                ScalerType::None => ScalerParams::IDENTITY,
                ScalerType::Standard => compute_standard(values),
            })
            .collect();

        self.is_fitted = true;
        Ok(self)
    }

    /// Scale a single value of column `idx`
    pub fn scale(&self, idx: usize, value: f64) -> Result<f64> {
        let params = self.params_for(idx)?;
        Ok((value - params.center) / params.scale)
    }

    /// Undo the scaling of column `idx`
    pub fn unscale(&self, idx: usize, value: f64) -> Result<f64> {
        let params = self.params_for(idx)?;
        Ok(value * params.scale + params.center)
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    fn params_for(&self, idx: usize) -> Result<&ScalerParams> {
        if !self.is_fitted {
            return Err(PropvalError::ModelNotFitted);
        }
        self.params
            .get(idx)
            .ok_or_else(|| PropvalError::Computation(format!("no scaler for column {}", idx)))
    }
}

fn compute_standard(values: &[f64]) -> ScalerParams {
    if values.is_empty() {
        return ScalerParams::IDENTITY;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();

    ScalerParams {
        center: if mean.is_finite() { mean } else { 0.0 },
        scale: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scaler() {
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&[vec![1.0, 2.0, 3.0, 4.0, 5.0]]).unwrap();

        let params = scaler.params()[0];
        assert!((params.center - 3.0).abs() < 1e-12);
        assert!((params.scale - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!(scaler.scale(0, 3.0).unwrap().abs() < 1e-12);
        assert!((scaler.unscale(0, scaler.scale(0, 4.2).unwrap()).unwrap() - 4.2).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_is_identity_scale() {
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&[vec![7.0, 7.0, 7.0]]).unwrap();
        assert_eq!(scaler.params()[0].scale, 1.0);
        assert_eq!(scaler.scale(0, 8.0).unwrap(), 1.0);
    }

    #[test]
    fn test_none_scaler() {
        let mut scaler = Scaler::new(ScalerType::None);
        scaler.fit(&[vec![10.0, 20.0]]).unwrap();
        assert_eq!(scaler.scale(0, 15.0).unwrap(), 15.0);
    }
}
