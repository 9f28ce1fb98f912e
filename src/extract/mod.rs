// src/extract/mod.rs

//! Workbook bytes → published date and the raw resource-by-period table.

pub mod date_parser;
pub mod raw_table;
pub mod workbook;

use anyhow::{anyhow, Context};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::{config::SpreadsheetConfig, error::EtlError};

pub use date_parser::{date_tail, parse_free_date};
pub use raw_table::{extract_resource_table, LABEL_COLUMN};
pub use workbook::{Cell, Grid, Workbook};

/// Read the publication date from the first cell below the skipped rows.
pub fn extract_published_date(grid: &[Vec<Cell>], skip_rows: usize) -> anyhow::Result<NaiveDate> {
    let cell = grid
        .get(skip_rows)
        .and_then(|row| row.first())
        .ok_or_else(|| anyhow!("no cell at row {} column A", skip_rows))?;
    let text = cell
        .as_text()
        .ok_or_else(|| anyhow!("expected text at row {} column A, found {:?}", skip_rows, cell))?;
    let tail = date_tail(text);
    parse_free_date(&tail).with_context(|| format!("cover sheet text {:?}", text))
}

/// Open the workbook and pull out the published date and the data table.
#[tracing::instrument(level = "info", skip(bytes, cfg), fields(bytes = bytes.len()))]
pub fn get_info(
    bytes: Vec<u8>,
    cfg: &SpreadsheetConfig,
) -> Result<(NaiveDate, RecordBatch), EtlError> {
    let mut book = Workbook::from_bytes(bytes).map_err(EtlError::Spreadsheet)?;
    debug!(sheets = ?book.sheet_names(), "opened workbook");

    let cover = book.sheet_grid(&cfg.cover_sheet).map_err(EtlError::Spreadsheet)?;
    let published = extract_published_date(&cover, cfg.cover_skip_rows)
        .map_err(EtlError::PublishedDate)?;

    let data = book.sheet_grid(&cfg.data_sheet).map_err(EtlError::Spreadsheet)?;
    let raw = extract_resource_table(&data, cfg.data_skip_rows)
        .with_context(|| format!("sheet {:?}", cfg.data_sheet))
        .map_err(EtlError::Spreadsheet)?;

    info!(
        %published,
        rows = raw.num_rows(),
        columns = raw.num_columns(),
        "extracted spreadsheet"
    );
    Ok((published, raw))
}
