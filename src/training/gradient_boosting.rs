//! Gradient boosted regression trees
//!
//! Squared-error boosting: each round fits a shallow tree to the current
//! residuals on a row subsample and adds it with shrinkage.

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use crate::error::{PropvalError, Result};

/// Gradient boosting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Row subsample ratio for each tree
    pub subsample: f64,
    /// Random seed
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            min_samples_leaf: 1,
            subsample: 0.8,
            random_state: 42,
        }
    }
}

/// Gradient boosting regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_prediction: f64,
    feature_importances: Vec<f64>,
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            feature_importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Fit the gradient boosting model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PropvalError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PropvalError::TrainingFailure(
                "gradient boosting needs at least one sample".to_string(),
            ));
        }
        if !(self.config.subsample > 0.0 && self.config.subsample <= 1.0) {
            return Err(PropvalError::Config(format!(
                "subsample must be in (0, 1], got {}",
                self.config.subsample
            )));
        }

        self.initial_prediction = y.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        self.trees.clear();
        self.feature_importances = vec![0.0; n_features];

        for _ in 0..self.config.n_estimators {
            let residuals: Array1<f64> = y - &predictions;
            let rows = self.subsample_indices(n_samples, &mut rng);

            let mut tree = DecisionTree::new()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit_rows(x, &residuals, &rows)?;

            // Out-of-sample rows are updated too
            let update = tree.predict(x)?;
            predictions.scaled_add(self.config.learning_rate, &update);

            if let Some(tree_importance) = tree.feature_importances() {
                for (acc, &val) in self.feature_importances.iter_mut().zip(tree_importance.iter()) {
                    *acc += val;
                }
            }

            self.trees.push(tree);
        }

        let total: f64 = self.feature_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= total;
            }
        }

        Ok(())
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let mut predictions = Array1::from_elem(x.nrows(), self.initial_prediction);
        for tree in &self.trees {
            predictions.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }
        Ok(predictions)
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let sample_size = (((n as f64) * self.config.subsample).ceil() as usize).clamp(1, n);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort_unstable();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_regression(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f64 / n as f64 } else { (i % 3) as f64 });
        let y = x.column(0).mapv(|v| 5.0 * v * v) + &x.column(1).mapv(|v| 0.5 * v);
        (x, y)
    }

    #[test]
    fn test_gradient_boosting_regressor() {
        let (x, y) = make_regression(200);
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 50,
            max_depth: 3,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let mse: f64 = (&predictions - &y).mapv(|v| v * v).mean().unwrap();
        let var = y.var(0.0);
        assert!(mse < 0.1 * var, "MSE {} vs variance {}", mse, var);
        assert_eq!(model.n_trees(), 50);
    }

    #[test]
    fn test_importances_normalized() {
        let (x, y) = make_regression(100);
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
            n_estimators: 10,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let sum: f64 = model.feature_importances().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(model.feature_importances()[0] > model.feature_importances()[1]);
    }

    #[test]
    fn test_seed_determinism() {
        let (x, y) = make_regression(80);
        let mut a = GradientBoostingRegressor::new(GradientBoostingConfig::default());
        let mut b = GradientBoostingRegressor::new(GradientBoostingConfig::default());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_invalid_subsample() {
        let (x, y) = make_regression(10);
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig {
            subsample: 0.0,
            ..Default::default()
        });
        assert!(matches!(model.fit(&x, &y), Err(PropvalError::Config(_))));
    }
}
