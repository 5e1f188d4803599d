//! Long-form date formatting for card fields.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Format an ISO-like date string as a long-form US-English date.
///
/// `"1984-06-05"` becomes `"June 5, 1984"`. Date-time inputs keep only their
/// calendar date as written; no timezone conversion is applied. Input that
/// cannot be parsed is returned unchanged.
pub fn format_long_date(input: &str) -> String {
    match parse_date(input) {
        Some(date) => date.format("%B %-d, %Y").to_string(),
        None => {
            tracing::debug!(input, "unparseable date, rendering verbatim");
            input.to_string()
        }
    }
}

fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    None
}
