// src/transform/period.rs

use once_cell::sync::Lazy;
use regex::Regex;

/// `<4-digit year><non-digits><quarter digit>`, anchored at the start.
static PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})\D+(\d)").expect("period regex should compile"));

/// Canonical `"YYYY Q"` form of a period header; anything else passes through.
///
/// `"2023 Q1"`, `"2023-Q1"` and `"2023 quarter1"` all become `"2023 1"`.
pub fn retrieve_year_quarter(col: &str) -> String {
    match PERIOD_RE.captures(col) {
        Some(caps) => format!("{} {}", &caps[1], &caps[2]),
        None => col.to_string(),
    }
}

/// `(year, quarter)` of a period header, if it has one.
pub fn parse_period(col: &str) -> Option<(i32, u32)> {
    let caps = PERIOD_RE.captures(col)?;
    let year = caps[1].parse().ok()?;
    let quarter = caps[2].parse().ok()?;
    Some((year, quarter))
}
