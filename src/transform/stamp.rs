// src/transform/stamp.rs

use std::sync::Arc;

use arrow::{
    array::{ArrayRef, StringArray, TimestampMicrosecondArray},
    record_batch::RecordBatch,
};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::EtlError;
use crate::transform::utils::with_column;

/// Append `date_published` (`YYYY-MM-DD`) and `date_processed` to every row.
pub fn add_dates(
    batch: &RecordBatch,
    published: NaiveDate,
    processed: NaiveDateTime,
) -> Result<RecordBatch, EtlError> {
    let rows = batch.num_rows();
    let published = published.format("%Y-%m-%d").to_string();
    let micros = processed.and_utc().timestamp_micros();

    let published: ArrayRef = Arc::new(StringArray::from(vec![published.as_str(); rows]));
    let processed: ArrayRef = Arc::new(TimestampMicrosecondArray::from(vec![micros; rows]));

    let out = with_column(batch, None, "date_published", published, false)?;
    with_column(&out, None, "date_processed", processed, false)
}

pub fn add_filename(batch: &RecordBatch, filename: &str) -> Result<RecordBatch, EtlError> {
    let names: ArrayRef = Arc::new(StringArray::from(vec![filename; batch.num_rows()]));
    with_column(batch, None, "filename", names, false)
}
