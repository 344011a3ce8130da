//! Price interval around a point estimate

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: f64,
    pub high: f64,
}

impl PriceRange {
    /// `predicted ± k·rmse` with both bounds floored at 0
    pub fn around(predicted: f64, rmse: f64, k: f64) -> Self {
        let half_width = if rmse.is_finite() { (k * rmse).abs() } else { 0.0 };
        let low = (predicted - half_width).max(0.0);
        Self {
            low,
            high: (predicted + half_width).max(low),
        }
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_interval() {
        let r = PriceRange::around(500_000.0, 40_000.0, 1.0);
        assert_eq!(r.low, 460_000.0);
        assert_eq!(r.high, 540_000.0);
        assert!(r.contains(500_000.0));
    }

    #[test]
    fn test_low_floored_at_zero() {
        let r = PriceRange::around(20_000.0, 50_000.0, 1.0);
        assert_eq!(r.low, 0.0);
        assert_eq!(r.high, 70_000.0);
    }

    #[test]
    fn test_negative_estimate_never_inverts() {
        let r = PriceRange::around(-255_000.0, 27_000.0, 1.0);
        assert_eq!(r.low, 0.0);
        assert_eq!(r.high, 0.0);
        assert!(r.low <= r.high);
    }
}
