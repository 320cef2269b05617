use chrono::{NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

mod drugs;
mod patents;

pub use drugs::normalize_drug;
pub use patents::normalize_patent;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Date-only formats accepted by the normalizer, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Timestamp stamped onto every record of one batch run. Passing the stamp in
/// keeps row normalization a pure function of (row, stamp).
pub fn batch_stamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Trim, collapse internal whitespace runs to a single space, and treat
/// anything empty after trimming as absent.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    let text = value?.trim();
    if text.is_empty() {
        return None;
    }
    Some(WHITESPACE_RUN.replace_all(text, " ").into_owned())
}

/// Normalize a textual date to `YYYY-MM-DD`. Values that fail every known
/// format are retained verbatim; malformed input degrades to passthrough
/// instead of failing the batch.
pub fn parse_date(value: Option<&str>) -> Option<String> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.date().format("%Y-%m-%d").to_string());
        }
    }

    Some(raw.to_string())
}

/// Split a semicolon-joined field into trimmed, non-empty tokens.
pub fn parse_list_field(value: Option<&str>) -> Vec<String> {
    match value {
        Some(field) => field
            .split(';')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

/// Deterministic content-addressed identifier: the non-empty parts joined by
/// `|`, hashed, truncated to 16 hex characters. Identical inputs yield the
/// same id across runs; this is the cross-source matching key.
pub fn generate_id(parts: &[Option<&str>]) -> String {
    let content = parts
        .iter()
        .copied()
        .flatten()
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join("|");

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..16].to_string()
}
