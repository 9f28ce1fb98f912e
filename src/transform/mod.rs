// src/transform/mod.rs

//! Wide resource-by-period sheet → long normalized records.

pub mod category;
pub mod clean;
pub mod melt;
pub mod period;
pub mod stamp;
pub mod utils;

use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::error::EtlError;

pub use category::{extract_pie_df, Category};
pub use clean::{clean_df, remove_note_data};
pub use melt::melt_df;
pub use period::{parse_period, retrieve_year_quarter};
pub use stamp::{add_dates, add_filename};

/// Category tagging, melt, clean, date and filename stamping, in that order.
#[tracing::instrument(level = "info", skip(raw), fields(rows = raw.num_rows()))]
pub fn transform_all(
    raw: &RecordBatch,
    published: NaiveDate,
    processed: NaiveDateTime,
    filename: &str,
) -> Result<RecordBatch, EtlError> {
    let tagged = extract_pie_df(raw)?;
    let melted = melt_df(&tagged)?;
    debug!(rows = melted.num_rows(), "melted");
    let cleaned = clean_df(&melted)?;
    let dated = add_dates(&cleaned, published, processed)?;
    add_filename(&dated, filename)
}
