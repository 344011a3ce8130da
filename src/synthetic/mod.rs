//! Synthetic housing data
//!
//! Generates a labeled dataset with realistic marginal distributions and a
//! known linear price formula plus Gaussian noise. Used for demos, benches
//! and tests where no real listings are available.

use crate::error::{PropvalError, Result};
use crate::property::{Dataset, PropertyRecord};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

const BEDROOMS: [(f64, f64); 6] = [(1.0, 0.05), (2.0, 0.15), (3.0, 0.30), (4.0, 0.25), (5.0, 0.20), (6.0, 0.05)];
const BATHROOMS: [f64; 9] = [1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0];
const PROPERTY_TYPES: [(&str, f64); 4] = [
    ("single_family", 0.60),
    ("condo", 0.20),
    ("townhouse", 0.15),
    ("multi_family", 0.05),
];

const MIN_PRICE: f64 = 50_000.0;
const MAX_PRICE: f64 = 2_000_000.0;

/// Seeded generator; the same `(n_samples, seed)` always yields the same dataset
#[derive(Debug, Clone)]
pub struct SyntheticHousingGenerator {
    n_samples: usize,
    seed: u64,
    noise_std: f64,
}

impl Default for SyntheticHousingGenerator {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl SyntheticHousingGenerator {
    pub fn new(n_samples: usize) -> Self {
        Self {
            n_samples,
            seed: 42,
            noise_std: 25_000.0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Standard deviation of the additive price noise
    pub fn with_noise_std(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    pub fn generate(&self) -> Result<Dataset> {
        if self.n_samples == 0 {
            return Err(PropvalError::Config("n_samples must be positive".to_string()));
        }
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(PropvalError::Config(format!(
                "noise_std must be finite and non-negative, got {}",
                self.noise_std
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut dataset = Dataset::default();
        for _ in 0..self.n_samples {
            let (record, price) = self.sample(&mut rng);
            dataset.push(record, price);
        }

        info!(n_samples = self.n_samples, seed = self.seed, "Generated synthetic housing data");
        Ok(dataset)
    }

    fn sample(&self, rng: &mut ChaCha8Rng) -> (PropertyRecord, f64) {
        let area = normal(rng, 2000.0, 800.0).clamp(500.0, 10_000.0);
        let bedrooms = weighted(rng, &BEDROOMS);
        let bathrooms = BATHROOMS[rng.gen_range(0..BATHROOMS.len())];
        let age = exponential(rng, 20.0).clamp(0.0, 150.0);
        let property_type = weighted(rng, &PROPERTY_TYPES);
        let amenities = beta(rng, 2.0, 1.0) * 10.0;
        let distance = exponential(rng, 8.0).clamp(0.0, 100.0);
        let school = beta(rng, 2.0, 1.5) * 10.0;
        let crime = gamma(rng, 2.0, 2.0).clamp(0.0, 20.0);
        let trend = normal(rng, 1.0, 0.1).clamp(0.5, 2.0);
        let environment = beta(rng, 1.5, 1.0) * 10.0;

        let single_family = if property_type == "single_family" { 50_000.0 } else { 0.0 };
        let price = 200_000.0
            + area * 100.0
            + bedrooms * 15_000.0
            + bathrooms * 12_000.0
            + (10.0 - age / 10.0) * 2_000.0
            + single_family
            + amenities * 8_000.0
            + (10.0 - distance) * 3_000.0
            + school * 12_000.0
            - crime * 2_000.0
            + (trend - 1.0) * 100_000.0
            + environment * 5_000.0
            + normal(rng, 0.0, self.noise_std);

        let record = PropertyRecord::new()
            .with_number("area_sqft", area)
            .with_number("bedrooms", bedrooms)
            .with_number("bathrooms", bathrooms)
            .with_number("age_years", age)
            .with_category("property_type", property_type)
            .with_number("amenities_score", amenities)
            .with_number("distance_to_center", distance)
            .with_number("school_rating", school)
            .with_number("crime_index", crime)
            .with_number("market_trend", trend)
            .with_number("environmental_score", environment);

        (record, price.clamp(MIN_PRICE, MAX_PRICE))
    }
}

/// Box-Muller
fn normal(rng: &mut ChaCha8Rng, mean: f64, std: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    mean + std * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn exponential(rng: &mut ChaCha8Rng, scale: f64) -> f64 {
    let u: f64 = rng.gen_range(f64::EPSILON..1.0);
    -scale * u.ln()
}

/// Marsaglia-Tsang; shapes below 1 are boosted by `U^(1/shape)`
fn gamma(rng: &mut ChaCha8Rng, shape: f64, scale: f64) -> f64 {
    if shape < 1.0 {
        let u: f64 = rng.gen_range(f64::EPSILON..1.0);
        return gamma(rng, shape + 1.0, scale) * u.powf(1.0 / shape);
    }
    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x = normal(rng, 0.0, 1.0);
        let v = (1.0 + c * x).powi(3);
        if v <= 0.0 {
            continue;
        }
        let u: f64 = rng.gen_range(f64::EPSILON..1.0);
        if u.ln() < 0.5 * x * x + d - d * v + d * v.ln() {
            return d * v * scale;
        }
    }
}

fn beta(rng: &mut ChaCha8Rng, a: f64, b: f64) -> f64 {
    let x = gamma(rng, a, 1.0);
    let y = gamma(rng, b, 1.0);
    x / (x + y)
}

fn weighted<T: Copy>(rng: &mut ChaCha8Rng, choices: &[(T, f64)]) -> T {
    let total: f64 = choices.iter().map(|(_, p)| p).sum();
    let mut target = rng.gen::<f64>() * total;
    for &(value, p) in choices {
        if target < p {
            return value;
        }
        target -= p;
    }
    choices[choices.len() - 1].0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertySchema;

    #[test]
    fn test_deterministic_for_seed() {
        let a = SyntheticHousingGenerator::new(50).with_seed(7).generate().unwrap();
        let b = SyntheticHousingGenerator::new(50).with_seed(7).generate().unwrap();
        assert_eq!(a.prices(), b.prices());
        assert_eq!(a.rows[10].record, b.rows[10].record);
    }

    #[test]
    fn test_rows_pass_schema_and_price_bounds() {
        let schema = PropertySchema::housing();
        let data = SyntheticHousingGenerator::new(300).generate().unwrap();
        assert_eq!(data.len(), 300);
        for row in &data.rows {
            schema.validate(&row.record).unwrap();
            assert!((MIN_PRICE..=MAX_PRICE).contains(&row.price));
        }
    }

    #[test]
    fn test_marginals_are_plausible() {
        let data = SyntheticHousingGenerator::new(2000).generate().unwrap();
        let areas: Vec<f64> = data.rows.iter().filter_map(|r| r.record.number("area_sqft")).collect();
        let mean_area = areas.iter().sum::<f64>() / areas.len() as f64;
        assert!((1800.0..2200.0).contains(&mean_area), "mean area {}", mean_area);

        let single = data
            .rows
            .iter()
            .filter(|r| r.record.text("property_type") == Some("single_family"))
            .count() as f64
            / data.len() as f64;
        assert!((0.55..0.65).contains(&single), "single family share {}", single);
    }

    #[test]
    fn test_rejects_empty() {
        assert!(SyntheticHousingGenerator::new(0).generate().is_err());
    }
}
