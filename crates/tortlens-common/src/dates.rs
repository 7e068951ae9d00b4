//! Date helpers for the encodings the upstream APIs use.
//!
//! openFDA stores dates as 8-digit `YYYYMMDD` strings; CourtListener uses
//! ISO dates or full RFC 3339 timestamps.

use chrono::{DateTime, NaiveDate};

/// Parse an openFDA `YYYYMMDD` date. Anything that is not exactly eight
/// ASCII digits forming a real calendar date yields `None`.
pub fn parse_yyyymmdd(value: &str) -> Option<NaiveDate> {
    let v = value.trim();
    if v.len() != 8 || !v.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(v, "%Y%m%d").ok()
}

pub fn format_yyyymmdd(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp, keeping only the date.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(v, "%Y-%m-%d") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(v).ok().map(|dt| dt.date_naive())
}
