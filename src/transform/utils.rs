// src/transform/utils.rs

use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, Float64Array, StringArray},
    compute::cast,
    datatypes::{DataType, Field, FieldRef, Schema},
    record_batch::RecordBatch,
};

use crate::error::EtlError;

/// Look up a column by name.
pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef, EtlError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| EtlError::Transform(format!("column `{}` not found", name)))
}

pub fn as_strings<'a>(arr: &'a ArrayRef, name: &str) -> Result<&'a StringArray, EtlError> {
    arr.as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| {
            EtlError::Transform(format!(
                "column `{}` should be Utf8, found {}",
                name,
                arr.data_type()
            ))
        })
}

/// Numeric column as `Float64`, casting integers.
pub fn as_f64(arr: &ArrayRef) -> Result<Float64Array, EtlError> {
    let casted = cast(arr, &DataType::Float64)?;
    casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| EtlError::Transform("cast to Float64 did not yield Float64".into()))
}

pub fn is_numeric(dt: &DataType) -> bool {
    matches!(dt, DataType::Int64 | DataType::Float64)
}

/// Insert (`Some(idx)`) or append (`None`) a column.
pub fn with_column(
    batch: &RecordBatch,
    at: Option<usize>,
    name: &str,
    array: ArrayRef,
    nullable: bool,
) -> Result<RecordBatch, EtlError> {
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    let field = Arc::new(Field::new(name, array.data_type().clone(), nullable));
    let idx = at.unwrap_or(fields.len()).min(fields.len());
    fields.insert(idx, field);
    columns.insert(idx, array);
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Build a batch from `(name, array, nullable)` triples.
pub fn batch_from(columns: Vec<(&str, ArrayRef, bool)>) -> Result<RecordBatch, EtlError> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, arr, nullable)| Field::new(*name, arr.data_type().clone(), *nullable))
        .collect();
    let arrays = columns.into_iter().map(|(_, arr, _)| arr).collect();
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect()
}
