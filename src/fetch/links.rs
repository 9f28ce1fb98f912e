// src/fetch/links.rs

use scraper::{Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::Fetch;
use crate::{config::Config, error::EtlError, ledger::retrieve_filename};

/// The spreadsheet anchor as written on the page, plus where it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcelLink {
    pub href: String,
    pub url: Url,
}

impl ExcelLink {
    /// Name recorded in the ledger. Taken from the raw `href` so it is not
    /// percent-encoded the way `Url::path` is.
    pub fn filename(&self) -> &str {
        retrieve_filename(&self.href)
    }
}

/// `href` of the first anchor matching `selector` whose text contains `title`.
pub fn find_excel_link(html: &str, selector: &str, title: &str) -> Result<String, EtlError> {
    let not_found = || EtlError::LinkNotFound {
        title: title.to_string(),
    };
    // An unparseable selector can never match anything.
    let sel = Selector::parse(selector).map_err(|_| not_found())?;

    let document = Html::parse_document(html);
    document
        .select(&sel)
        .filter(|a| {
            let text = a.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            text.contains(title)
        })
        .find_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .ok_or_else(not_found)
}

/// Join a possibly relative `href` onto the page it was found on.
pub fn resolve_link(base: &str, href: &str) -> Result<Url, EtlError> {
    let invalid = |source| EtlError::InvalidLink {
        href: href.to_string(),
        source,
    };
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map_err(invalid)
}

/// GET the landing page and resolve the spreadsheet link on it.
#[tracing::instrument(level = "info", skip_all, fields(url = %cfg.landing_url))]
pub fn get_excel_link(fetcher: &dyn Fetch, cfg: &Config) -> Result<ExcelLink, EtlError> {
    let body = fetcher.get(&cfg.landing_url)?;
    let html = String::from_utf8_lossy(&body);
    debug!(bytes = body.len(), "landing page");

    let href = find_excel_link(&html, &cfg.link_selector, &cfg.link_title)?;
    let url = resolve_link(&cfg.landing_url, &href)?;
    info!(link = %url, "found spreadsheet link");
    Ok(ExcelLink { href, url })
}
