//! Execution date parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::HandlerError;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an execution date.
///
/// Accepts RFC 3339 (offsets are converted to UTC and dropped), naive
/// `YYYY-MM-DDTHH:MM:SS[.f]`, `YYYY-MM-DD HH:MM:SS[.f]` and bare
/// `YYYY-MM-DD` (midnight).
pub fn parse_execution_date(value: &str) -> Result<NaiveDateTime, HandlerError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }
    if let Some(dt) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(dt);
    }

    Err(HandlerError::BadRequest(format!(
        "Given execution date, {}, could not be identified as a date. \
         Example date format: 2015-11-16T14:34:15 or 2015-11-16T14:34:15+08:00",
        value
    )))
}

/// ISO 8601 form used in generated run ids.
pub fn isoformat(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}
