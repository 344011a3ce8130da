//! Seeded train/test splitting and k-fold cross-validation

use crate::error::{PropvalError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A single train/test split
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub random_state: u64,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            random_state: 42,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Generate `n_splits` folds; the first `n_samples % n_splits` folds get one extra row
    pub fn split(&self, n_samples: usize) -> Result<Vec<CVSplit>> {
        if self.n_splits < 2 {
            return Err(PropvalError::Config("n_splits must be at least 2".to_string()));
        }
        if n_samples < self.n_splits {
            return Err(PropvalError::TrainingFailure(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;

        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }

        Ok(splits)
    }
}

/// Shuffled hold-out split. Returns `(train_indices, test_indices)`.
///
/// The test side gets `ceil(n * test_size)` rows, adjusted so both sides are non-empty.
pub fn train_test_split(n_samples: usize, test_size: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PropvalError::Config(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    if n_samples < 2 {
        return Err(PropvalError::TrainingFailure(format!(
            "need at least 2 rows to split, got {}",
            n_samples
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n_samples as f64 * test_size).ceil() as usize).clamp(1, n_samples - 1);
    let train = indices.split_off(n_test);
    Ok((train, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kfold_partitions_all_rows() {
        let splits = KFold::new(5).split(23).unwrap();
        assert_eq!(splits.len(), 5);

        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());

        assert_eq!(splits[0].test_indices.len(), 5);
        assert_eq!(splits[4].test_indices.len(), 4);
        for s in &splits {
            assert_eq!(s.train_indices.len() + s.test_indices.len(), 23);
        }
    }

    #[test]
    fn test_kfold_seeded() {
        let a = KFold::new(3).with_random_state(9).split(12).unwrap();
        let b = KFold::new(3).with_random_state(9).split(12).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kfold_rejects_too_few_rows() {
        assert!(KFold::new(5).split(3).is_err());
        assert!(KFold::new(1).split(10).is_err());
    }

    #[test]
    fn test_train_test_split_sizes() {
        let (train, test) = train_test_split(100, 0.2, 42).unwrap();
        assert_eq!(test.len(), 20);
        assert_eq!(train.len(), 80);

        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());

        assert_eq!(train_test_split(100, 0.2, 42).unwrap(), (train, test));
    }

    #[test]
    fn test_train_test_split_invalid_ratio() {
        assert!(matches!(train_test_split(10, 1.0, 1), Err(PropvalError::Config(_))));
    }
}
