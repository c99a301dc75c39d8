//! Date handling for the chronological filters.
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::Error;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Converts a date into epoch milliseconds.
///
/// Accepts `*` (the current instant), RFC 3339 timestamps, and ISO dates from
/// `YYYY-MM-DDTHH:MM:SS` down to a bare `YYYY`. Naive dates are read as UTC.
pub fn date_to_unix_timestamp(date: &str) -> Result<i64, Error> {
    let date = date.trim();

    if date == "*" {
        return Ok(Utc::now().timestamp_millis());
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(date) {
        return Ok(datetime.timestamp_millis());
    }

    for format in DATETIME_FORMATS.iter() {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(date, format) {
            return Ok(datetime.and_utc().timestamp_millis());
        }
    }

    // Pad partial dates out to the first day of the period
    let padded = match date.len() {
        4 => format!("{}-01-01", date),
        7 => format!("{}-01", date),
        _ => date.to_owned(),
    };

    NaiveDate::parse_from_str(&padded, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
        .ok_or_else(|| Error::InvalidDate(date.to_owned()))
}

/// Interprets a filter value as a cutoff in epoch milliseconds.
///
/// `null` means the filter was not requested. Integers are taken as epoch
/// milliseconds already; strings go through [`date_to_unix_timestamp`].
pub fn cutoff_from_value(value: &Value) -> Result<Option<i64>, Error> {
    match value {
        Value::Null => Ok(None),
        Value::String(date) => date_to_unix_timestamp(date).map(Some),
        Value::Number(number) => number
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::InvalidDate(number.to_string())),
        other => Err(Error::InvalidDate(other.to_string())),
    }
}
