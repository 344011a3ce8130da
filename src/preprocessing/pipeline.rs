//! Feature pipeline: validation, imputation, scaling and one-hot encoding

use super::{
    config::PreprocessingConfig,
    encoder::{OneHotEncoder, MISSING_CATEGORY},
    imputer::Imputer,
    scaler::Scaler,
};
use crate::error::{PropvalError, Result};
use crate::property::{PropertyRecord, PropertySchema};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Ordered feature values produced by a fitted pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub names: Arc<[String]>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn to_array(&self) -> Array1<f64> {
        Array1::from(self.values.clone())
    }
}

/// Per-numeric-field statistics frozen at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub name: String,
    pub median: f64,
    pub mean: f64,
    pub std: f64,
}

/// Unfitted pipeline
#[derive(Debug, Clone, Default)]
pub struct FeaturePipeline {
    config: PreprocessingConfig,
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// Learn imputation, scaling and encoding state from `records`.
    ///
    /// Every record is validated against `schema` first.
    pub fn fit(&self, schema: &PropertySchema, records: &[&PropertyRecord]) -> Result<FittedPipeline> {
        let start = Instant::now();

        if records.is_empty() {
            return Err(PropvalError::TrainingFailure(
                "cannot fit feature pipeline on an empty dataset".to_string(),
            ));
        }
        for record in records {
            schema.validate(record)?;
        }

        let observed: Vec<Vec<f64>> = schema
            .numeric
            .iter()
            .map(|field| records.iter().filter_map(|r| r.number(&field.name)).collect())
            .collect();
        let midpoints: Vec<f64> = schema
            .numeric
            .iter()
            .map(|field| (field.min + field.max) / 2.0)
            .collect();

        let mut imputer = Imputer::new(self.config.numeric_impute_strategy);
        imputer.fit(&observed, &midpoints)?;

        // Scaling statistics are computed on imputed columns
        let imputed: Vec<Vec<f64>> = schema
            .numeric
            .iter()
            .enumerate()
            .map(|(j, field)| {
                records
                    .iter()
                    .map(|r| imputer.fill(j, r.number(&field.name)))
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<_>>()?;

        let mut scaler = Scaler::new(self.config.scaler_type);
        scaler.fit(&imputed)?;

        let encoders: Vec<OneHotEncoder> = schema
            .categorical
            .iter()
            .map(|field| {
                OneHotEncoder::fit(
                    &field.name,
                    records.iter().map(|r| category_of(r, &field.name)),
                )
            })
            .collect();

        let mut names: Vec<String> = schema.numeric.iter().map(|f| f.name.clone()).collect();
        for encoder in &encoders {
            names.extend(encoder.feature_names());
        }

        debug!(
            rows = records.len(),
            features = names.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fitted feature pipeline"
        );

        Ok(FittedPipeline {
            schema: schema.clone(),
            imputer,
            scaler,
            encoders,
            feature_names: names.into(),
        })
    }
}

/// Immutable pipeline state learned at fit time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPipeline {
    schema: PropertySchema,
    imputer: Imputer,
    scaler: Scaler,
    encoders: Vec<OneHotEncoder>,
    feature_names: Arc<[String]>,
}

impl FittedPipeline {
    pub fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    pub fn feature_names(&self) -> &Arc<[String]> {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn encoders(&self) -> &[OneHotEncoder] {
        &self.encoders
    }

    /// Frozen median/mean/std per numeric field, in declared order
    pub fn numeric_stats(&self) -> Vec<NumericStats> {
        self.schema
            .numeric
            .iter()
            .zip(self.imputer.fill_values())
            .zip(self.scaler.params())
            .map(|((field, &median), params)| NumericStats {
                name: field.name.clone(),
                median,
                mean: params.center,
                std: params.scale,
            })
            .collect()
    }

    /// Validate and transform one record
    pub fn transform(&self, record: &PropertyRecord) -> Result<FeatureVector> {
        self.schema.validate(record)?;
        let values = self.encode(record)?;
        Ok(FeatureVector {
            names: Arc::clone(&self.feature_names),
            values,
        })
    }

    /// Validate and transform many records into a row-major matrix
    pub fn transform_batch(&self, records: &[&PropertyRecord]) -> Result<Array2<f64>> {
        let rows: Vec<Vec<f64>> = records
            .par_iter()
            .map(|record| {
                self.schema.validate(record)?;
                self.encode(record)
            })
            .collect::<Result<_>>()?;

        let n_features = self.n_features();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((records.len(), n_features), flat)?)
    }

    fn encode(&self, record: &PropertyRecord) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(self.n_features());

        for (j, field) in self.schema.numeric.iter().enumerate() {
            let raw = self.imputer.fill(j, record.number(&field.name))?;
            values.push(self.scaler.scale(j, raw)?);
        }
        for encoder in &self.encoders {
            encoder.encode_into(category_of(record, encoder.attribute()), &mut values);
        }

        Ok(values)
    }
}

/// Category text as validated (surrounding whitespace ignored)
fn category_of<'a>(record: &'a PropertyRecord, name: &str) -> &'a str {
    record.text(name).map(str::trim).unwrap_or(MISSING_CATEGORY)
}
