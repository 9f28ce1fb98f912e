// src/fetch/mod.rs

pub mod links;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use std::{thread::sleep, time::Duration};
use tracing::{debug, warn};

use crate::{config::HttpConfig, error::EtlError};

pub use links::{find_excel_link, get_excel_link, resolve_link, ExcelLink};

/// Anything that can GET a URL. The pipeline only sees this trait.
pub trait Fetch {
    fn get(&self, url: &str) -> Result<Vec<u8>, EtlError>;
}

/// Blocking HTTP client with a fixed number of attempts and a fixed delay.
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    delay: Duration,
}

impl HttpFetcher {
    pub fn new(cfg: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(concat!("etscraper/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            retries: cfg.retries.max(1),
            delay: cfg.retry_delay(),
        })
    }

    fn get_once(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(anyhow!("HTTP {}", status));
        }
        Ok(resp.bytes()?.to_vec())
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, EtlError> {
        with_retry(url, self.retries, self.delay, || self.get_once(url))
    }
}

/// Call `op` up to `attempts` times, sleeping `delay` between failures.
pub fn with_retry<T>(
    url: &str,
    attempts: u32,
    delay: Duration,
    mut op: impl FnMut() -> Result<T>,
) -> Result<T, EtlError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op() {
            Ok(v) => {
                debug!(url, attempt, "GET ok");
                return Ok(v);
            }
            Err(e) if attempt < attempts => {
                warn!(url, attempt, error = %format!("{:#}", e), "GET failed, retrying");
                sleep(delay);
            }
            Err(e) => {
                warn!(url, attempt, error = %format!("{:#}", e), "GET failed, giving up");
                return Err(EtlError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last: format!("{:#}", e),
                });
            }
        }
    }
}
