//! Regression tree (CART, squared-error criterion)

use crate::error::{PropvalError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        /// Reduction in summed squared error achieved by this split
        gain: f64,
    },
}

/// Running sums over a contiguous block of targets
#[derive(Debug, Clone, Copy, Default)]
struct SplitStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
}

impl SplitStats {
    fn push(&mut self, y: f64) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
    }

    fn minus(&self, other: &SplitStats) -> SplitStats {
        SplitStats {
            count: self.count - other.count,
            sum: self.sum - other.sum,
            sq_sum: self.sq_sum - other.sq_sum,
        }
    }

    /// Summed squared error around the block mean
    fn sse(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sq_sum - self.sum * self.sum / self.count as f64).max(0.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum number of split levels below the root
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    n_features: usize,
    /// Normalized impurity-decrease importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, &indices)
    }

    /// Fit on a subset of rows. Repeated indices (bootstrap samples) are allowed.
    pub fn fit_rows(&mut self, x: &Array2<f64>, y: &Array1<f64>, rows: &[usize]) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(PropvalError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if rows.is_empty() {
            return Err(PropvalError::TrainingFailure(
                "decision tree needs at least one sample".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let mut importances = vec![0.0; self.n_features];
        let mut indices = rows.to_vec();
        self.root = Some(self.build_tree(x, y, &mut indices, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &mut [usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let mut stats = SplitStats::default();
        for &i in indices.iter() {
            stats.push(y[i]);
        }
        let leaf_value = stats.sum / n_samples as f64;

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || stats.sse() <= 1e-12;

        if should_stop {
            return TreeNode::Leaf {
                value: leaf_value,
                n_samples,
            };
        }

        let best = match self.find_best_split(x, y, indices, &stats) {
            Some(best) => best,
            None => {
                return TreeNode::Leaf {
                    value: leaf_value,
                    n_samples,
                }
            }
        };

        // In-place partition: left block first
        let mut boundary = 0;
        for k in 0..indices.len() {
            if x[[indices[k], best.feature_idx]] <= best.threshold {
                indices.swap(k, boundary);
                boundary += 1;
            }
        }

        importances[best.feature_idx] += best.gain;

        let (left_idx, right_idx) = indices.split_at_mut(boundary);
        let left = Box::new(self.build_tree(x, y, left_idx, depth + 1, importances));
        let right = Box::new(self.build_tree(x, y, right_idx, depth + 1, importances));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            gain: best.gain,
        }
    }

    /// Scan every feature with one sort plus prefix sums
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        parent: &SplitStats,
    ) -> Option<BestSplit> {
        let parent_sse = parent.sse();
        let min_leaf = self.min_samples_leaf;
        let n = indices.len();
        let mut best: Option<BestSplit> = None;
        let mut order: Vec<usize> = Vec::with_capacity(n);

        for feature_idx in 0..x.ncols() {
            order.clear();
            order.extend_from_slice(indices);
            order.sort_by(|&a, &b| x[[a, feature_idx]].total_cmp(&x[[b, feature_idx]]));

            let mut left = SplitStats::default();
            for k in 0..n - 1 {
                left.push(y[order[k]]);
                let here = x[[order[k], feature_idx]];
                let next = x[[order[k + 1], feature_idx]];
                if here == next {
                    continue;
                }
                if left.count < min_leaf || n - left.count < min_leaf {
                    continue;
                }

                let right = parent.minus(&left);
                let gain = parent_sse - left.sse() - right.sse();
                if gain > best.map_or(1e-12, |b| b.gain) {
                    best = Some(BestSplit {
                        feature_idx,
                        threshold: split_threshold(here, next),
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PropvalError::ModelNotFitted)?;
        self.check_width(x.ncols())?;
        Ok(x.rows().into_iter().map(|row| Self::predict_row(root, row)).collect())
    }

    /// Predict a single feature row
    pub fn predict_one(&self, row: ArrayView1<f64>) -> Result<f64> {
        let root = self.root.as_ref().ok_or(PropvalError::ModelNotFitted)?;
        self.check_width(row.len())?;
        Ok(Self::predict_row(root, row))
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.n_features {
            return Err(PropvalError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", width),
            });
        }
        Ok(())
    }

    fn predict_row(mut node: &TreeNode, row: ArrayView1<f64>) -> f64 {
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of node levels (a single leaf has depth 1)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

/// Midpoint of two distinct sorted values that still sends `here` left and
/// `next` right under the `<=` rule
fn split_threshold(here: f64, next: f64) -> f64 {
    let mid = here + (next - here) / 2.0;
    if mid < next {
        mid
    } else {
        here
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;

        assert!(mse < 1e-12, "MSE too high: {}", mse);
    }

    #[test]
    fn test_step_function_threshold() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![5.0, 5.0, 5.0, 50.0, 50.0, 50.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.get_n_leaves(), 2);
        assert_eq!(tree.predict_one(array![6.0].view()).unwrap(), 5.0);
        assert_eq!(tree.predict_one(array![7.0].view()).unwrap(), 50.0);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 1.0, 2.0, 3.0];

        let mut tree = DecisionTree::new().with_max_depth(1);
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.get_depth(), 2);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_min_samples_leaf() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 0.0, 100.0];

        let mut tree = DecisionTree::new().with_min_samples_leaf(2);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.get_n_leaves(), 2);
        assert_eq!(tree.predict_one(array![4.0].view()).unwrap(), 50.0);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_bootstrap_rows() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut tree = DecisionTree::new();
        tree.fit_rows(&x, &y, &[0, 0, 3, 3]).unwrap();
        assert_eq!(tree.predict_one(array![1.0].view()).unwrap(), 1.0);
        assert_eq!(tree.predict_one(array![4.0].view()).unwrap(), 4.0);
    }

    #[test]
    fn test_unfitted_predict_errors() {
        let tree = DecisionTree::new();
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(PropvalError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_split_threshold_separates_adjacent_floats() {
        let here = 1.0 + f64::EPSILON;
        let next = 1.0 + 2.0 * f64::EPSILON;
        let t = split_threshold(here, next);
        assert!(here <= t && t < next);

        assert_eq!(split_threshold(2.0, 4.0), 3.0);
        assert!(split_threshold(f64::MAX / 2.0, f64::MAX).is_finite());
    }
}
