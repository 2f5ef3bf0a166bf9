pub mod alpaca;
pub mod csv_feed;

pub use alpaca::AlpacaBarsFeed;
pub use csv_feed::CsvPriceFeed;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Accepts RFC3339, naive datetime, and plain-date forms; plain dates map to
/// midnight UTC.
pub fn parse_timestamp(value: &str) -> Result<i64, String> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc().timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc().timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc().timestamp());
        }
    }
    Err(format!("unsupported timestamp format: {}", value))
}
