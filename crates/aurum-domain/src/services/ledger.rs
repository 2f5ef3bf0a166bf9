use crate::value_objects::pair::PairSpec;
use crate::value_objects::position_state::PositionState;
use crate::value_objects::side::Side;
use crate::value_objects::signal::Signal;
use crate::value_objects::trade::Trade;
use chrono::NaiveDate;

const QTY_EPS: f64 = 1e-9;

/// Signed per-leg book reconstructed from the trade journal.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerState {
    pub lead_qty: f64,
    pub lag_qty: f64,
    pub entered_day: Option<NaiveDate>,
    pub last_trade_day: Option<NaiveDate>,
}

impl LedgerState {
    pub fn flat() -> Self {
        Self {
            lead_qty: 0.0,
            lag_qty: 0.0,
            entered_day: None,
            last_trade_day: None,
        }
    }

    /// Pair state when the legs are balanced; None mid-transition.
    pub fn state(&self) -> Option<PositionState> {
        state_of(self.lead_qty, self.lag_qty)
    }

    pub fn is_balanced(&self) -> bool {
        self.state().is_some()
    }
}

pub fn state_of(lead_qty: f64, lag_qty: f64) -> Option<PositionState> {
    let lead_flat = lead_qty.abs() < QTY_EPS;
    let lag_flat = lag_qty.abs() < QTY_EPS;
    if lead_flat && lag_flat {
        return Some(PositionState::Flat);
    }
    if lead_qty > QTY_EPS && lag_qty < -QTY_EPS {
        return Some(PositionState::Long);
    }
    if lead_qty < -QTY_EPS && lag_qty > QTY_EPS {
        return Some(PositionState::Short);
    }
    None
}

/// Folds the trade history into the current book. The journal must yield
/// exactly one consistent position series: unknown symbols, non-positive
/// quantities, and balanced states that contradict the recorded
/// resulting_state are hard errors.
pub fn replay(pair: &PairSpec, trades: &[Trade]) -> Result<LedgerState, String> {
    let mut ledger = LedgerState::flat();
    let mut last_balanced = PositionState::Flat;

    for trade in trades {
        if !pair.contains(&trade.symbol) {
            return Err(format!(
                "trade journal references symbol {} outside pair {}",
                trade.symbol,
                pair.label()
            ));
        }
        if !trade.quantity.is_finite() || trade.quantity <= 0.0 {
            return Err(format!(
                "trade journal has non-positive quantity {} for {}",
                trade.quantity, trade.symbol
            ));
        }

        let signed = match trade.side {
            Side::Buy => trade.quantity,
            Side::Sell => -trade.quantity,
        };
        if trade.symbol == pair.lead {
            ledger.lead_qty += signed;
        } else {
            ledger.lag_qty += signed;
        }
        ledger.last_trade_day = Some(trade.trading_day);

        if let Some(state) = ledger.state() {
            if state != trade.resulting_state {
                return Err(format!(
                    "trade journal inconsistent on {}: derived {} but recorded {}",
                    trade.trading_day,
                    state.as_str(),
                    trade.resulting_state.as_str()
                ));
            }
            if state != last_balanced {
                ledger.entered_day = if state.is_open() {
                    Some(trade.trading_day)
                } else {
                    None
                };
                last_balanced = state;
            }
        }
    }

    Ok(ledger)
}

/// Every balanced state change in the trade replay must be backed by a
/// signal of the same trading day and target state.
pub fn consistent_with_signals(
    pair: &PairSpec,
    trades: &[Trade],
    signals: &[Signal],
) -> Result<(), String> {
    let mut ledger = LedgerState::flat();
    let mut last_balanced = PositionState::Flat;

    for trade in trades {
        let signed = match trade.side {
            Side::Buy => trade.quantity,
            Side::Sell => -trade.quantity,
        };
        if trade.symbol == pair.lead {
            ledger.lead_qty += signed;
        } else if trade.symbol == pair.lag {
            ledger.lag_qty += signed;
        } else {
            return Err(format!("unknown symbol in trades: {}", trade.symbol));
        }

        if let Some(state) = ledger.state() {
            if state != last_balanced {
                let backed = signals
                    .iter()
                    .any(|signal| signal.trading_day == trade.trading_day && signal.state == state);
                if !backed {
                    return Err(format!(
                        "trade transition to {} on {} has no matching signal",
                        state.as_str(),
                        trade.trading_day
                    ));
                }
                last_balanced = state;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{replay, state_of, LedgerState};
    use crate::value_objects::pair::PairSpec;
    use crate::value_objects::position_state::PositionState;
    use crate::value_objects::side::Side;
    use crate::value_objects::trade::Trade;
    use chrono::NaiveDate;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn trade(
        symbol: &str,
        side: Side,
        qty: f64,
        resulting_state: PositionState,
        trading_day: &str,
    ) -> Trade {
        Trade {
            timestamp: 0,
            trading_day: day(trading_day),
            symbol: symbol.to_string(),
            side,
            quantity: qty,
            price: 100.0,
            resulting_state,
        }
    }

    fn pair() -> PairSpec {
        PairSpec::new("GLD", "GDX")
    }

    #[test]
    fn empty_journal_is_flat() {
        let ledger = replay(&pair(), &[]).unwrap();
        assert_eq!(ledger, LedgerState::flat());
        assert_eq!(ledger.state(), Some(PositionState::Flat));
    }

    #[test]
    fn open_and_close_round_trip() {
        let trades = vec![
            trade("GLD", Side::Buy, 10.0, PositionState::Long, "2026-08-03"),
            trade("GDX", Side::Sell, 60.0, PositionState::Long, "2026-08-03"),
            trade("GLD", Side::Sell, 10.0, PositionState::Flat, "2026-08-04"),
            trade("GDX", Side::Buy, 60.0, PositionState::Flat, "2026-08-04"),
        ];
        let ledger = replay(&pair(), &trades).unwrap();
        assert_eq!(ledger.state(), Some(PositionState::Flat));
        assert_eq!(ledger.entered_day, None);
        assert_eq!(ledger.last_trade_day, Some(day("2026-08-04")));
    }

    #[test]
    fn entered_day_tracks_open_transition() {
        let trades = vec![
            trade("GLD", Side::Buy, 10.0, PositionState::Long, "2026-08-03"),
            trade("GDX", Side::Sell, 60.0, PositionState::Long, "2026-08-03"),
        ];
        let ledger = replay(&pair(), &trades).unwrap();
        assert_eq!(ledger.state(), Some(PositionState::Long));
        assert_eq!(ledger.entered_day, Some(day("2026-08-03")));
    }

    #[test]
    fn one_legged_book_is_unbalanced() {
        let trades = vec![trade("GLD", Side::Buy, 10.0, PositionState::Long, "2026-08-03")];
        let ledger = replay(&pair(), &trades).unwrap();
        assert_eq!(ledger.state(), None);
    }

    #[test]
    fn mismatched_resulting_state_is_rejected() {
        let trades = vec![
            trade("GLD", Side::Buy, 10.0, PositionState::Long, "2026-08-03"),
            trade("GDX", Side::Sell, 60.0, PositionState::Short, "2026-08-03"),
        ];
        assert!(replay(&pair(), &trades).is_err());
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let trades = vec![trade("SLV", Side::Buy, 10.0, PositionState::Long, "2026-08-03")];
        assert!(replay(&pair(), &trades).is_err());
    }

    #[test]
    fn state_of_rejects_same_direction_legs() {
        assert_eq!(state_of(10.0, 60.0), None);
        assert_eq!(state_of(-10.0, -60.0), None);
    }
}
