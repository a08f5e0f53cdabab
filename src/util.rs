// Utility helpers for parsing and number formatting.
//
// This module centralizes all the "dirty" CSV/number/date handling so the
// rest of the code can work with `Option<f64>` / `Option<NaiveDate>`.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Date layouts seen in the merged exports, tried in order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y.%m.%d", "%Y.%m.%d.", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces, text).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Rejects values that contain alphabetic characters.
/// - A lone comma followed by one or two digits (and no `.`) is a decimal
///   comma: `12,5` is 12.5. Any other comma is a thousands separator.
/// - Spaces and non-breaking spaces are thousands separators.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s: String = s.chars().filter(|c| *c != ' ' && *c != '\u{a0}').collect();
    let decimal_comma = !s.contains('.')
        && s.matches(',').count() == 1
        && s
            .rsplit_once(',')
            .map(|(_, frac)| (1..=2).contains(&frac.len()) && frac.bytes().all(|b| b.is_ascii_digit()))
            .unwrap_or(false);
    let normalized = if decimal_comma { s.replace(',', ".") } else { s.replace(',', "") };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a calendar date. Timestamps are accepted and truncated to the day.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
}

pub fn average(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Fixed decimals with `en` thousands grouping, e.g. `1,234,567.89`.
/// Values that round to zero never carry a minus sign.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let grouped = whole
        .parse::<u64>()
        .map(|w| w.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| whole.to_string());
    let sign = if n < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) { "-" } else { "" };
    if frac.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac}")
    }
}

/// Render an optional metric; unavailable values print as `n/a`.
pub fn format_metric(n: Option<f64>, decimals: usize) -> String {
    match n {
        Some(v) => format_number(v, decimals),
        None => "n/a".to_string(),
    }
}

/// Row and column counts for console messages (`9,855 rows`).
pub fn format_count(n: usize) -> String {
    n.to_formatted_string(&Locale::en)
}
