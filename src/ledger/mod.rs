// src/ledger/mod.rs

//! The CSV ledger of every ingested row: novelty check on read, append on write.

pub mod write;

use anyhow::{anyhow, Context, Result};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::{config::Config, error::EtlError};

pub use write::WriteSummary;

/// (resource, category, year, quarter)
pub type RowKey = (String, String, i64, i64);

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    fallback: PathBuf,
}

/// Last `/`-separated segment of a link.
pub fn retrieve_filename(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fallback: fallback.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.ledger_path, &cfg.fallback_ledger_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fallback(&self) -> &Path {
        &self.fallback
    }

    /// `true` unless `filename` is already recorded. `force` skips the lookup.
    pub fn confirm_new_file(&self, filename: &str, force: bool) -> Result<bool, EtlError> {
        if force {
            info!(filename, "forced download, skipping novelty check");
            return Ok(true);
        }
        let seen = recorded_filenames(&self.path).map_err(|source| EtlError::LedgerRead {
            path: self.path.clone(),
            source,
        })?;
        let novel = !seen.contains(filename);
        debug!(filename, novel, known = seen.len(), "novelty check");
        Ok(novel)
    }
}

fn is_blank(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(m) => Ok(m.len() == 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e).with_context(|| format!("stat {}", path.display())),
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| anyhow!("ledger has no {:?} column", name))
}

/// Distinct values of the `filename` column; empty when there is no ledger yet.
pub fn recorded_filenames(path: &Path) -> Result<HashSet<String>> {
    if is_blank(path)? {
        return Ok(HashSet::new());
    }
    let mut rdr = open_reader(path)?;
    let idx = column_index(rdr.headers()?, "filename")?;

    let mut out = HashSet::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("ledger row {}", line + 1))?;
        if let Some(name) = record.get(idx) {
            out.insert(name.to_string());
        }
    }
    Ok(out)
}

/// Header of an existing ledger, or `None` if there is nothing to read.
pub fn recorded_header(path: &Path) -> Result<Option<Vec<String>>> {
    if is_blank(path)? {
        return Ok(None);
    }
    let mut rdr = open_reader(path)?;
    Ok(Some(rdr.headers()?.iter().map(str::to_string).collect()))
}

/// Every (resource, category, year, quarter) already in the ledger.
pub fn recorded_keys(path: &Path) -> Result<HashSet<RowKey>> {
    if is_blank(path)? {
        return Ok(HashSet::new());
    }
    let mut rdr = open_reader(path)?;
    let headers = rdr.headers()?.clone();
    let [resource, category, year, quarter] = ["resource", "category", "year", "quarter"]
        .map(|name| column_index(&headers, name));
    let (resource, category, year, quarter) = (resource?, category?, year?, quarter?);

    let mut keys = HashSet::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("ledger row {}", line + 1))?;
        let field = |i: usize| record.get(i).unwrap_or("");
        let int = |i: usize| {
            field(i)
                .parse::<i64>()
                .with_context(|| format!("ledger row {}: bad integer {:?}", line + 1, field(i)))
        };
        keys.insert((
            field(resource).to_string(),
            field(category).to_string(),
            int(year)?,
            int(quarter)?,
        ));
    }
    Ok(keys)
}
