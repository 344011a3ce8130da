//! Prediction confidence from importance concentration and held-out R²

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse confidence bucket shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLabel {
    Low,
    Medium,
    High,
}

impl ConfidenceLabel {
    /// `< 0.4` Low, `<= 0.7` Medium, else High
    pub fn from_score(score: f64) -> Self {
        if score < 0.4 {
            ConfidenceLabel::Low
        } else if score <= 0.7 {
            ConfidenceLabel::Medium
        } else {
            ConfidenceLabel::High
        }
    }
}

impl fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfidenceLabel::Low => "Low",
            ConfidenceLabel::Medium => "Medium",
            ConfidenceLabel::High => "High",
        };
        f.write_str(s)
    }
}

/// How strongly a feature drives the model, derived from its importance weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactStrength {
    Strong,
    Moderate,
    Mild,
    Minimal,
}

impl ImpactStrength {
    pub fn from_weight(weight: f64) -> Self {
        if weight >= 0.3 {
            ImpactStrength::Strong
        } else if weight >= 0.15 {
            ImpactStrength::Moderate
        } else if weight >= 0.05 {
            ImpactStrength::Mild
        } else {
            ImpactStrength::Minimal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactStrength::Strong => "strong",
            ImpactStrength::Moderate => "moderate",
            ImpactStrength::Mild => "mild",
            ImpactStrength::Minimal => "minimal",
        }
    }
}

/// Normalized concentration of an importance vector in [0, 1].
///
/// `(Σw² - 1/n) / (1 - 1/n)` over weights renormalized to sum to 1:
/// 0 for uniform, empty, all-zero or non-finite input; 1 when a single
/// feature carries all weight (including n = 1).
pub fn concentration(weights: &[f64]) -> f64 {
    let n = weights.len();
    if n == 0 || weights.iter().any(|w| !w.is_finite()) {
        return 0.0;
    }
    let total: f64 = weights.iter().map(|w| w.abs()).sum();
    if total <= 0.0 {
        return 0.0;
    }
    if n == 1 {
        return 1.0;
    }

    let inv_n = 1.0 / n as f64;
    let sum_sq: f64 = weights.iter().map(|w| (w.abs() / total).powi(2)).sum();
    ((sum_sq - inv_n) / (1.0 - inv_n)).clamp(0.0, 1.0)
}

/// `clamp(α·concentration + (1 − α)·clamp(r2, 0, 1), 0, 1)`.
///
/// Non-decreasing in `test_r2`; a NaN R² counts as 0.
pub fn confidence_score(weights: &[f64], test_r2: f64, importance_weight: f64) -> f64 {
    let alpha = if importance_weight.is_finite() {
        importance_weight.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let r2 = if test_r2.is_nan() { 0.0 } else { test_r2.clamp(0.0, 1.0) };
    (alpha * concentration(weights) + (1.0 - alpha) * r2).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concentration_bounds() {
        assert_eq!(concentration(&[]), 0.0);
        assert_eq!(concentration(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(concentration(&[f64::NAN, 1.0]), 0.0);
        assert_eq!(concentration(&[0.7]), 1.0);
        assert!(concentration(&[0.25, 0.25, 0.25, 0.25]).abs() < 1e-12);
        assert!((concentration(&[1.0, 0.0, 0.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_monotonic_in_r2() {
        let weights = [0.5, 0.3, 0.2];
        let mut previous = -1.0;
        for i in -10..=20 {
            let r2 = i as f64 / 10.0;
            let c = confidence_score(&weights, r2, 0.3);
            assert!(c >= previous);
            assert!((0.0..=1.0).contains(&c));
            previous = c;
        }
    }

    #[test]
    fn test_degenerate_inputs_bounded() {
        for weights in [vec![], vec![0.0, 0.0], vec![f64::INFINITY]] {
            for r2 in [f64::NAN, -5.0, 0.5, 3.0] {
                let c = confidence_score(&weights, r2, 0.3);
                assert!((0.0..=1.0).contains(&c), "{:?} {} -> {}", weights, r2, c);
            }
        }
    }

    #[test]
    fn test_labels_and_strength() {
        assert_eq!(ConfidenceLabel::from_score(0.39), ConfidenceLabel::Low);
        assert_eq!(ConfidenceLabel::from_score(0.7), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::from_score(0.71), ConfidenceLabel::High);
        assert_eq!(ImpactStrength::from_weight(0.3), ImpactStrength::Strong);
        assert_eq!(ImpactStrength::from_weight(0.2), ImpactStrength::Moderate);
        assert_eq!(ImpactStrength::from_weight(0.05), ImpactStrength::Mild);
        assert_eq!(ImpactStrength::from_weight(0.01), ImpactStrength::Minimal);
    }
}
