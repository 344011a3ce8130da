//! What-if analysis
//!
//! A scenario is a sparse set of field overrides applied to a base property.
//! Every scenario is priced through the same serve path as a plain
//! prediction, and its impact is reported relative to the base.

use crate::error::{PropvalError, Result};
use crate::inference::{PredictionResult, Predictor};
use crate::property::PropertyRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Price change of one scenario relative to the base
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioImpact {
    pub absolute: f64,
    pub percentage: f64,
}

impl ScenarioImpact {
    fn between(base_price: f64, scenario_price: f64) -> Self {
        let absolute = scenario_price - base_price;
        Self {
            absolute,
            percentage: absolute / base_price * 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub base: PredictionResult,
    /// One result per scenario, in input order
    pub scenarios: Vec<PredictionResult>,
    pub impacts: Vec<ScenarioImpact>,
}

pub struct ScenarioAnalyzer {
    predictor: Predictor,
}

impl ScenarioAnalyzer {
    pub fn new(predictor: Predictor) -> Self {
        Self { predictor }
    }

    pub fn evaluate(&self, base: &PropertyRecord, scenarios: &[PropertyRecord]) -> Result<ScenarioReport> {
        let schema = self.predictor.bundle().pipeline.schema();
        for overrides in scenarios {
            schema.validate_overrides(overrides)?;
        }

        let base_result = self.predictor.predict(base)?;
        let base_price = base_result.predicted_price;
        if base_price == 0.0 {
            return Err(PropvalError::DegenerateBase { base_price });
        }

        let results: Vec<PredictionResult> = scenarios
            .par_iter()
            .map(|overrides| self.predictor.predict(&base.merged(overrides)))
            .collect::<Result<_>>()?;

        let impacts: Vec<ScenarioImpact> = results
            .iter()
            .map(|r| ScenarioImpact::between(base_price, r.predicted_price))
            .collect();

        info!(
            version = %self.predictor.version(),
            scenarios = results.len(),
            base_price,
            "Scenario analysis complete"
        );

        Ok(ScenarioReport {
            base: base_result,
            scenarios: results,
            impacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impact_arithmetic() {
        let impact = ScenarioImpact::between(400_000.0, 460_000.0);
        assert_eq!(impact.absolute, 60_000.0);
        assert!((impact.percentage - 15.0).abs() < 1e-12);

        let drop = ScenarioImpact::between(500_000.0, 450_000.0);
        assert!((drop.percentage + 10.0).abs() < 1e-12);
    }
}
