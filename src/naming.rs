//! Date handling and output file naming.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

pub const DEFAULT_MAX_FILENAME_LEN: usize = 150;

/// Base name used when a row has neither site nor date.
pub const FALLBACK_REPORT_NAME: &str = "report";

const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const SHORT_YEAR_FORMATS: &[&str] = &["%d.%m.%y", "%d/%m/%y", "%d-%m-%y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

fn illegal_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1F]+"#).expect("illegal filename regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

fn trim_name(s: &str) -> &str {
    s.trim_matches(|c: char| c == ' ' || c == '.' || c == '-')
}

/// Replace path-illegal characters with `-`, collapse whitespace and cut to `max_len` characters.
/// Tabs count as whitespace; other control characters are illegal.
/// The result never starts or ends with a space, dot or dash.
pub fn safe_filename(s: &str, max_len: usize) -> String {
    let spaced = s.replace('\t', " ");
    let replaced = illegal_chars().replace_all(&spaced, "-");
    let collapsed = whitespace_runs().replace_all(&replaced, " ");
    let trimmed = trim_name(&collapsed);
    let cut: String = trimmed.chars().take(max_len).collect();
    trim_name(&cut).to_string()
}

/// Parse `dd.mm.YYYY`, `dd/mm/YYYY`, `YYYY-mm-dd` and the close variants spreadsheets emit.
/// Day-first wins for ambiguous slash/dot dates.
pub fn parse_any_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            // %Y happily reads "25" as year 25
            if date.year() >= 1000 {
                return Ok(date);
            }
        }
    }
    for fmt in SHORT_YEAR_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!("Unknown date format: {}", s))
}

/// `06/08/2025` -> `2025-08-06`. Unparseable input keeps its digits with `-` separators.
pub fn normalize_date(s: &str) -> String {
    match parse_any_date(s) {
        Ok(date) => date.format("%Y-%m-%d").to_string(),
        Err(_) => s.trim().replace(['/', '\\'], "-"),
    }
}

/// `06/08/2025` -> `06.08.2025`, the form used in report titles and file names.
pub fn format_date_title(s: &str) -> String {
    match parse_any_date(s) {
        Ok(date) => date.format("%d.%m.%Y").to_string(),
        Err(_) => s.trim().replace(['/', '-'], "."),
    }
}

/// `{site}_{dd.mm.YYYY}` made filesystem-safe, or [`FALLBACK_REPORT_NAME`].
pub fn report_base_name(site: &str, date: &str) -> String {
    let site = site.trim();
    let date = date.trim();
    let mut parts = Vec::with_capacity(2);
    if !site.is_empty() {
        parts.push(site.to_string());
    }
    if !date.is_empty() {
        parts.push(format_date_title(date));
    }
    let name = safe_filename(&parts.join("_"), DEFAULT_MAX_FILENAME_LEN);
    if name.is_empty() {
        FALLBACK_REPORT_NAME.to_string()
    } else {
        name
    }
}

/// Hands out unique names within one batch: `x`, `x_2`, `x_3`, ... in call order.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut counter = 2u32;
        while self.used.contains(&name) {
            name = format!("{}_{}", base, counter);
            counter += 1;
        }
        self.used.insert(name.clone());
        name
    }
}
