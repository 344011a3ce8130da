//! Property records, datasets and the declared attribute schema

mod record;
mod schema;

pub use record::{Dataset, FieldValue, LabeledProperty, PropertyRecord};
pub use schema::{CategoricalField, NumericField, PropertySchema};
