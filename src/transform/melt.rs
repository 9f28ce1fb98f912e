// src/transform/melt.rs

use std::sync::Arc;

use arrow::{
    array::{Array, ArrayRef, Float64Builder, StringBuilder},
    record_batch::RecordBatch,
};

use crate::error::EtlError;
use crate::transform::period::retrieve_year_quarter;
use crate::transform::utils::{as_f64, as_strings, batch_from};

/// Number of leading identifier columns (label, category).
const ID_COLUMNS: usize = 2;

/// Pivot `[label, category, <period>...]` into
/// `[resource, category, year_quarter, figures]`.
///
/// One output row per (row, period), period-major: every resource for the
/// first period, then every resource for the next.
pub fn melt_df(batch: &RecordBatch) -> Result<RecordBatch, EtlError> {
    let schema = batch.schema();
    if schema.fields().len() < ID_COLUMNS {
        return Err(EtlError::Transform(format!(
            "melt needs label and category columns, found {}",
            schema.fields().len()
        )));
    }

    let labels = as_strings(batch.column(0), schema.field(0).name())?;
    let categories = as_strings(batch.column(1), schema.field(1).name())?;

    let rows = batch.num_rows();
    let periods = schema.fields().len() - ID_COLUMNS;
    let capacity = rows * periods;

    let mut resource = StringBuilder::with_capacity(capacity, capacity * 16);
    let mut category = StringBuilder::with_capacity(capacity, capacity * 8);
    let mut year_quarter = StringBuilder::with_capacity(capacity, capacity * 6);
    let mut figures = Float64Builder::with_capacity(capacity);

    for (idx, field) in schema.fields().iter().enumerate().skip(ID_COLUMNS) {
        let period = retrieve_year_quarter(field.name());
        let values = as_f64(batch.column(idx))?;
        for row in 0..rows {
            resource.append_option(labels.is_valid(row).then(|| labels.value(row)));
            category.append_option(categories.is_valid(row).then(|| categories.value(row)));
            year_quarter.append_value(&period);
            figures.append_option(values.is_valid(row).then(|| values.value(row)));
        }
    }

    batch_from(vec![
        ("resource", Arc::new(resource.finish()) as ArrayRef, true),
        ("category", Arc::new(category.finish()) as ArrayRef, true),
        ("year_quarter", Arc::new(year_quarter.finish()) as ArrayRef, false),
        ("figures", Arc::new(figures.finish()) as ArrayRef, true),
    ])
}
