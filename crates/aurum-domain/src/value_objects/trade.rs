use crate::value_objects::position_state::PositionState;
use crate::value_objects::side::Side;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub timestamp: i64,
    pub trading_day: NaiveDate,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub resulting_state: PositionState,
}
