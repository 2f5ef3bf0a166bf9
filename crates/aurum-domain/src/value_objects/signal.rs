use crate::value_objects::position_state::PositionState;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub timestamp: i64,
    pub trading_day: NaiveDate,
    pub state: PositionState,
    pub spread: f64,
    pub zscore: f64,
    pub reason: String,
}
