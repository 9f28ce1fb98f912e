// src/pipeline.rs

use arrow::{record_batch::RecordBatch, util::pretty::pretty_format_batches};
use chrono::{Local, NaiveDateTime, SubsecRound};
use tracing::{debug, info};

use crate::{
    config::Config,
    error::EtlError,
    extract::get_info,
    fetch::{get_excel_link, Fetch},
    ledger::Ledger,
    transform::transform_all,
    validate::{
        input::{input_checks, input_schema_validation},
        output::{output_check_duplicates, output_schema_validation},
    },
};

const PREVIEW_ROWS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The ledger already lists this file.
    Skipped { filename: String },
    Ingested {
        filename: String,
        rows_written: usize,
        rows_skipped: usize,
    },
}

/// Local wall-clock time with the sub-second part dropped.
pub fn processed_now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

fn preview(batch: &RecordBatch) {
    let head = batch.slice(0, batch.num_rows().min(PREVIEW_ROWS));
    match pretty_format_batches(&[head]) {
        Ok(table) => debug!("output preview:\n{}", table),
        Err(e) => debug!(error = %e, "could not render preview"),
    }
}

/// Link → novelty → extract → validate → transform → validate → ledger.
#[tracing::instrument(level = "info", skip_all, fields(processed_at = %processed_at))]
pub fn run(
    cfg: &Config,
    fetcher: &dyn Fetch,
    processed_at: NaiveDateTime,
) -> Result<RunOutcome, EtlError> {
    let link = get_excel_link(fetcher, cfg)?;
    let filename = link.filename().to_string();

    let ledger = Ledger::from_config(cfg);
    if !ledger.confirm_new_file(&filename, cfg.force_download)? {
        info!(%filename, ledger = %ledger.path().display(), "file already ingested, nothing to do");
        return Ok(RunOutcome::Skipped { filename });
    }

    let bytes = fetcher.get(link.url.as_str())?;
    info!(%filename, bytes = bytes.len(), "downloaded spreadsheet");
    let (published, raw) = get_info(bytes, &cfg.spreadsheet)?;

    input_schema_validation(&raw).map_err(EtlError::InputSchema)?;
    input_checks(&raw).map_err(EtlError::InputIntegrity)?;
    info!(rows = raw.num_rows(), "input checks passed");

    let out = transform_all(&raw, published, processed_at, &filename)?;
    preview(&out);

    output_schema_validation(&out).map_err(EtlError::OutputSchema)?;
    output_check_duplicates(&out).map_err(EtlError::OutputSchema)?;
    info!(rows = out.num_rows(), "output checks passed");

    let summary = ledger.write(&out)?;
    Ok(RunOutcome::Ingested {
        filename,
        rows_written: summary.rows_written,
        rows_skipped: summary.rows_skipped,
    })
}
