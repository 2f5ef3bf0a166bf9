use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn trading_day(&self) -> Result<NaiveDate, String> {
        trading_day_from_timestamp(self.timestamp)
    }
}

pub fn trading_day_from_timestamp(timestamp: i64) -> Result<NaiveDate, String> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| format!("timestamp out of range: {}", timestamp))
}
