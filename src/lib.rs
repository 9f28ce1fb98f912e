// src/lib.rs

//! Scrapes the quarterly oil supply spreadsheet from the Energy Trends
//! statistics page and appends its figures, normalized, to a CSV ledger.

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ledger;
pub mod logging;
pub mod pipeline;
pub mod transform;
pub mod validate;

pub use config::Config;
pub use error::{EtlError, Severity};
pub use pipeline::{run, RunOutcome};
