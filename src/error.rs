// src/error.rs

use std::path::PathBuf;

use thiserror::Error;

use crate::validate::ValidationError;

/// How far an error is allowed to travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Stops the run.
    Fatal,
    /// Logged; the run still counts as finished.
    Recoverable,
}

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("unsuccessful GET {url} after {attempts} attempts (last: {last})")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },

    #[error("file link not found - {title}")]
    LinkNotFound { title: String },

    #[error("invalid link {href}: {source}")]
    InvalidLink {
        href: String,
        #[source]
        source: url::ParseError,
    },

    #[error("spreadsheet: {0:#}")]
    Spreadsheet(#[source] anyhow::Error),

    #[error("issue with retrieving published date: {0:#}")]
    PublishedDate(#[source] anyhow::Error),

    #[error("input excel schema: {0}")]
    InputSchema(#[source] ValidationError),

    #[error("input excel integrity: {0}")]
    InputIntegrity(#[source] ValidationError),

    #[error("transform: {0}")]
    Transform(String),

    #[error("output schema: {0}")]
    OutputSchema(#[source] ValidationError),

    #[error("reading ledger {}: {source:#}", path.display())]
    LedgerRead {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "error saving to {}: {source:#}, so stored in {}",
        requested.display(),
        fallback.display()
    )]
    LedgerFallback {
        requested: PathBuf,
        fallback: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "error saving to {} ({primary:#}) and to fallback {} ({source:#})",
        requested.display(),
        fallback.display()
    )]
    LedgerWrite {
        requested: PathBuf,
        fallback: PathBuf,
        primary: anyhow::Error,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}

impl EtlError {
    pub fn severity(&self) -> Severity {
        match self {
            EtlError::LedgerFallback { .. } => Severity::Recoverable,
            _ => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
