// src/ledger/write.rs

use anyhow::{bail, Context, Result};
use arrow::{
    array::{Array, BooleanArray, Int64Array},
    compute::filter_record_batch,
    csv::WriterBuilder,
    record_batch::RecordBatch,
};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

use super::{recorded_header, recorded_keys, Ledger, RowKey};
use crate::{
    error::EtlError,
    transform::utils::{as_strings, column},
    validate::output::{output_column_names, PROCESSED_FORMAT},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub rows_written: usize,
    pub rows_skipped: usize,
}

impl Ledger {
    /// Append `batch` to the ledger, falling back to the secondary location.
    ///
    /// Writing to the fallback still returns `EtlError::LedgerFallback` so the
    /// caller knows the primary ledger was not updated.
    #[tracing::instrument(level = "info", skip_all, fields(path = %self.path().display(), rows = batch.num_rows()))]
    pub fn write(&self, batch: &RecordBatch) -> Result<WriteSummary, EtlError> {
        let primary = match append_to(self.path(), batch) {
            Ok(summary) => return Ok(summary),
            Err(e) => e,
        };
        warn!(
            error = %format!("{:#}", primary),
            fallback = %self.fallback().display(),
            "ledger write failed, trying fallback"
        );

        match append_to(self.fallback(), batch) {
            Ok(_) => Err(EtlError::LedgerFallback {
                requested: self.path().to_path_buf(),
                fallback: self.fallback().to_path_buf(),
                source: primary,
            }),
            Err(source) => {
                error!(error = %format!("{:#}", source), "fallback ledger write failed");
                Err(EtlError::LedgerWrite {
                    requested: self.path().to_path_buf(),
                    fallback: self.fallback().to_path_buf(),
                    primary,
                    source,
                })
            }
        }
    }
}

fn batch_keys(batch: &RecordBatch) -> Result<Vec<RowKey>, EtlError> {
    let resource = as_strings(column(batch, "resource")?, "resource")?;
    let category = as_strings(column(batch, "category")?, "category")?;
    let int_col = |name: &str| -> Result<Int64Array, EtlError> {
        let col = column(batch, name)?;
        col.as_any()
            .downcast_ref::<Int64Array>()
            .cloned()
            .ok_or_else(|| EtlError::Transform(format!("{} is {}, expected Int64", name, col.data_type())))
    };
    let year = int_col("year")?;
    let quarter = int_col("quarter")?;

    Ok((0..batch.num_rows())
        .map(|i| {
            (
                resource.value(i).to_string(),
                category.value(i).to_string(),
                year.value(i),
                quarter.value(i),
            )
        })
        .collect())
}

/// Append rows whose key is not yet in the file at `path`.
fn append_to(path: &Path, batch: &RecordBatch) -> Result<WriteSummary> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }

    let expected = output_column_names();
    let header = recorded_header(path)?;
    if let Some(found) = &header {
        if found.iter().map(String::as_str).ne(expected.iter().copied()) {
            bail!("ledger header {:?} does not match {:?}", found, expected);
        }
    }

    let existing = recorded_keys(path)?;
    let keys = batch_keys(batch)?;
    let keep: BooleanArray = keys.iter().map(|k| Some(!existing.contains(k))).collect();
    let fresh = filter_record_batch(batch, &keep)?;
    let rows_skipped = batch.num_rows() - fresh.num_rows();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {} for append", path.display()))?;
    let mut writer = WriterBuilder::new()
        .with_header(header.is_none())
        .with_timestamp_format(PROCESSED_FORMAT.to_string())
        .build(file);
    writer
        .write(&fresh)
        .with_context(|| format!("writing {}", path.display()))?;

    info!(
        path = %path.display(),
        rows_written = fresh.num_rows(),
        rows_skipped,
        "ledger updated"
    );
    Ok(WriteSummary {
        path: path.to_path_buf(),
        rows_written: fresh.num_rows(),
        rows_skipped,
    })
}
