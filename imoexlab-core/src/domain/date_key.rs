//! Calendar-date join key shared by every artifact kind.
//!
//! Timestamps coming from the origins carry a time of day. They are truncated
//! to the calendar date exactly once, here, and the date as written is kept
//! (origin timestamps are exchange-local already, so no timezone shift).

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// A calendar date with no time component.
pub type DateKey = NaiveDate;

/// Canonical string form of a [`DateKey`].
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Format a date key as `YYYY-MM-DD`.
pub fn format_key(date: DateKey) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` string into a date key.
pub fn parse_key(s: &str) -> Result<DateKey, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_KEY_FORMAT)
}

/// Truncate a timestamp string to its calendar date.
///
/// Accepts ISO-8601 / RFC 3339 timestamps (with `T` or a space separator,
/// optional seconds and fractional seconds, optional offset) and bare dates.
/// Returns `None` for anything else.
pub fn normalize_timestamp(ts: &str) -> Option<DateKey> {
    let ts = ts.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(ts, fmt) {
            return Some(dt.date());
        }
    }

    parse_key(ts).ok()
}
