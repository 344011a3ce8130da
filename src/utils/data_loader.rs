//! CSV dataset loading and saving

use crate::error::{PropvalError, Result};
use crate::property::{Dataset, FieldValue, PropertyRecord, PropertySchema};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Reads labeled property datasets from CSV.
///
/// Columns named after schema fields become record fields; nulls leave the
/// field absent so imputation can fill it. Other columns are ignored.
pub struct DataLoader {
    schema: PropertySchema,
    target: String,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(PropertySchema::housing())
    }
}

impl DataLoader {
    pub fn new(schema: PropertySchema) -> Self {
        Self {
            schema,
            target: "price".to_string(),
        }
    }

    /// Name of the price column
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let start = Instant::now();
        let path = path.as_ref();
        let file = File::open(path)?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(100))
            .into_reader_with_file_handle(file)
            .finish()?;

        let dataset = self.from_dataframe(&df)?;
        info!(
            path = %path.display(),
            rows = dataset.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(dataset)
    }

    pub fn from_dataframe(&self, df: &DataFrame) -> Result<Dataset> {
        let n_rows = df.height();
        let mut records = vec![PropertyRecord::new(); n_rows];

        let prices = float_column(df, &self.target)?
            .ok_or_else(|| PropvalError::Data(format!("missing target column '{}'", self.target)))?;

        for field in &self.schema.numeric {
            let Some(values) = float_column(df, &field.name)? else {
                debug!(field = %field.name, "Column absent from dataset");
                continue;
            };
            for (record, value) in records.iter_mut().zip(values) {
                if let Some(v) = value {
                    record.set(field.name.as_str(), v);
                }
            }
        }

        for field in &self.schema.categorical {
            let Ok(column) = df.column(&field.name) else {
                debug!(field = %field.name, "Column absent from dataset");
                continue;
            };
            let series = column.as_materialized_series().cast(&DataType::String)?;
            for (record, value) in records.iter_mut().zip(series.str()?.into_iter()) {
                if let Some(s) = value {
                    record.set(field.name.as_str(), FieldValue::Text(s.to_string()));
                }
            }
        }

        let mut dataset = Dataset::default();
        for (idx, (record, price)) in records.into_iter().zip(prices).enumerate() {
            let price = price.ok_or_else(|| {
                PropvalError::Data(format!("row {}: missing value in '{}'", idx, self.target))
            })?;
            dataset.push(record, price);
        }
        Ok(dataset)
    }

    /// Columns: schema fields in declaration order, then the target
    pub fn to_dataframe(&self, dataset: &Dataset) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.schema.numeric.len() + self.schema.categorical.len() + 1);

        for field in &self.schema.numeric {
            let values: Vec<Option<f64>> = dataset.rows.iter().map(|r| r.record.number(&field.name)).collect();
            columns.push(Column::new(field.name.as_str().into(), values));
        }
        for field in &self.schema.categorical {
            let values: Vec<Option<String>> = dataset
                .rows
                .iter()
                .map(|r| r.record.text(&field.name).map(str::to_string))
                .collect();
            columns.push(Column::new(field.name.as_str().into(), values));
        }
        columns.push(Column::new(self.target.as_str().into(), dataset.prices()));

        Ok(DataFrame::new(columns)?)
    }

    pub fn save_csv(&self, dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_dataframe(dataset)?;
        let mut file = File::create(path.as_ref())?;
        CsvWriter::new(&mut file).finish(&mut df)?;
        info!(path = %path.as_ref().display(), rows = dataset.len(), "Saved dataset");
        Ok(())
    }
}

/// Column cast to f64, `None` if the frame lacks it
fn float_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<f64>>>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(Some(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_csv_with_gaps() {
        let file = write_csv(
            "area_sqft,bedrooms,bathrooms,age_years,property_type,school_rating,city,price\n\
             2500,4,3,10,single_family,8.5,Austin,650000\n\
             1200,2,1.5,40,condo,,Denver,310000\n",
        );
        let data = DataLoader::default().load_csv(file.path()).unwrap();

        assert_eq!(data.len(), 2);
        assert_eq!(data.prices(), vec![650_000.0, 310_000.0]);
        let first = &data.rows[0].record;
        assert_eq!(first.number("bedrooms"), Some(4.0));
        assert_eq!(first.text("property_type"), Some("single_family"));
        assert!(!first.contains("city"));
        assert!(!data.rows[1].record.contains("school_rating"));
    }

    #[test]
    fn test_missing_target_is_data_error() {
        let file = write_csv("area_sqft,bedrooms\n2500,4\n");
        let err = DataLoader::default().load_csv(file.path()).unwrap_err();
        assert!(matches!(err, PropvalError::Data(_)));
    }

    #[test]
    fn test_save_then_load() {
        let mut data = Dataset::default();
        data.push(
            PropertyRecord::new()
                .with_number("area_sqft", 1800.0)
                .with_number("bedrooms", 3.0)
                .with_number("bathrooms", 2.0)
                .with_number("age_years", 12.0)
                .with_category("property_type", "townhouse"),
            420_000.0,
        );

        let file = NamedTempFile::new().unwrap();
        let loader = DataLoader::default();
        loader.save_csv(&data, file.path()).unwrap();
        let loaded = loader.load_csv(file.path()).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.rows[0].record, data.rows[0].record);
        assert_eq!(loaded.prices(), data.prices());
    }
}
