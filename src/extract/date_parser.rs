// src/extract/date_parser.rs

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static ORDINAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{1,2})(st|nd|rd|th)$").expect("ordinal regex should compile"));

/// Tried in order against the normalized text.
const FORMATS: &[&str] = &[
    "%d %B %Y",
    "%B %d %Y",
    "%Y %B %d",
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
];

/// The last three whitespace-separated tokens of the first line.
///
/// The cover sheet reads e.g. "Next update: 30 July 2023", so the date is
/// always the tail of the line.
pub fn date_tail(text: &str) -> String {
    let tokens: Vec<&str> = text.lines().next().unwrap_or("").split_whitespace().collect();
    tokens[tokens.len().saturating_sub(3)..].join(" ")
}

fn normalize_token(token: &str) -> String {
    let token = token.trim_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '(' | ')'));
    match ORDINAL_RE.captures(token) {
        Some(caps) => caps[1].to_string(),
        None => token.to_string(),
    }
}

/// Lenient day/month/year parser for free text such as "30th July, 2023".
pub fn parse_free_date(text: &str) -> Result<NaiveDate> {
    let normalized = text
        .split_whitespace()
        .map(normalize_token)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&normalized, fmt).ok())
        .ok_or_else(|| anyhow!("unrecognised date {:?}", text))
}
