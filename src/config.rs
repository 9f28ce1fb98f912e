// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "ETSCRAPER_CONFIG";
/// Picked up from the working directory when `CONFIG_ENV` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "etscraper.yaml";

/// Everything a run needs. Built once at start-up and passed down.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Statistics landing page holding the spreadsheet link.
    pub landing_url: String,
    /// CSS selector for candidate attachment anchors.
    pub link_selector: String,
    /// Substring of the anchor text that identifies the spreadsheet.
    pub link_title: String,
    pub http: HttpConfig,
    pub spreadsheet: SpreadsheetConfig,
    pub ledger_path: PathBuf,
    /// Used when `ledger_path` cannot be written.
    pub fallback_ledger_path: PathBuf,
    /// Ingest even if the ledger already lists the file.
    pub force_download: bool,
    /// Exit 0 on fatal errors (they are still logged).
    pub swallow_fatal_errors: bool,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub retries: u32,
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpreadsheetConfig {
    pub cover_sheet: String,
    pub cover_skip_rows: usize,
    pub data_sheet: String,
    pub data_skip_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            landing_url: "https://www.gov.uk/government/statistics/oil-and-oil-products-section-3-energy-trends".into(),
            link_selector: "a.govuk-link.gem-c-attachment__link".into(),
            link_title: "Supply and use of crude oil, natural gas liquids and feedstocks".into(),
            http: HttpConfig::default(),
            spreadsheet: SpreadsheetConfig::default(),
            ledger_path: PathBuf::from("submit_csv/DeltaTable.csv"),
            fallback_ledger_path: PathBuf::from("DeltaTable.csv"),
            force_download: false,
            swallow_fatal_errors: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_secs: 10,
        }
    }
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        Self {
            cover_sheet: "Cover Sheet".into(),
            cover_skip_rows: 3,
            data_sheet: "Quarter".into(),
            data_skip_rows: 4,
        }
    }
}

impl HttpConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Config {
    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(text).context("parsing YAML config")?;
        cfg.check()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("loading config {}", path.display()))
    }

    /// `$ETSCRAPER_CONFIG`, else `./etscraper.yaml` if present, else defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Self::from_file(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::from_file(local);
        }
        Ok(Self::default())
    }

    fn check(&self) -> Result<()> {
        if self.http.retries == 0 {
            anyhow::bail!("http.retries must be at least 1");
        }
        if self.link_title.trim().is_empty() {
            anyhow::bail!("link_title must not be empty");
        }
        Ok(())
    }
}
