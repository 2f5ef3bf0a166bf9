use crate::entities::pair_book::PairBook;
use crate::services::ledger;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::pair::PairSpec;
use crate::value_objects::position_state::PositionState;
use crate::value_objects::trade::Trade;
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
pub struct MetricsSummary {
    pub ticks: usize,
    pub trades: usize,
    pub round_trips: usize,
    pub win_rate: f64,
    pub net_profit: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct MetricsConfig {
    pub risk_free_rate: f64,
    pub annualization_factor: Option<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            annualization_factor: None,
        }
    }
}

pub fn summarize(
    config: MetricsConfig,
    pair: &PairSpec,
    initial_capital: f64,
    trades: &[Trade],
    equity: &[EquityPoint],
) -> MetricsSummary {
    let (round_trips, wins) = round_trip_outcomes(pair, initial_capital, trades);

    MetricsSummary {
        ticks: equity.len(),
        trades: trades.len(),
        round_trips,
        win_rate: if round_trips == 0 {
            0.0
        } else {
            wins as f64 / round_trips as f64
        },
        net_profit: net_profit(equity),
        sharpe: sharpe_ratio(config, equity),
        max_drawdown: max_drawdown(equity),
    }
}

fn net_profit(equity: &[EquityPoint]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(first), Some(last)) => last.equity - first.equity,
        _ => 0.0,
    }
}

fn max_drawdown(equity: &[EquityPoint]) -> f64 {
    let mut peak = 0.0f64;
    let mut max_dd = 0.0f64;
    for point in equity {
        if peak == 0.0 || point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            let drawdown = (peak - point.equity) / peak;
            if drawdown > max_dd {
                max_dd = drawdown;
            }
        }
    }
    max_dd
}

fn sharpe_ratio(config: MetricsConfig, equity: &[EquityPoint]) -> f64 {
    if equity.len() < 2 {
        return 0.0;
    }

    let mut returns = Vec::with_capacity(equity.len() - 1);
    for pair in equity.windows(2) {
        let prev = pair[0].equity;
        let curr = pair[1].equity;
        if prev > 0.0 {
            returns.push(curr / prev - 1.0 - config.risk_free_rate);
        }
    }
    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let var = returns
        .iter()
        .map(|ret| {
            let diff = ret - mean;
            diff * diff
        })
        .sum::<f64>()
        / (returns.len() as f64 - 1.0);
    let std = var.sqrt();
    if std == 0.0 {
        0.0
    } else {
        let scale = config.annualization_factor.unwrap_or(returns.len() as f64);
        mean / std * scale.sqrt()
    }
}

/// Round-trip outcomes: realized PnL deltas between consecutive flat states
/// of the replayed book.
fn round_trip_outcomes(pair: &PairSpec, initial_capital: f64, trades: &[Trade]) -> (usize, usize) {
    let mut book = PairBook::new_with_cash(initial_capital);
    let mut realized_at_last_flat = 0.0f64;
    let mut was_open = false;
    let mut round_trips = 0usize;
    let mut wins = 0usize;

    for trade in trades {
        book.apply_fill(&trade.symbol, trade.side, trade.quantity, trade.price);

        let state = ledger::state_of(
            book.position_qty(&pair.lead),
            book.position_qty(&pair.lag),
        );
        match state {
            Some(PositionState::Flat) if was_open => {
                round_trips += 1;
                let pnl = book.realized_pnl() - realized_at_last_flat;
                if pnl > 0.0 {
                    wins += 1;
                }
                realized_at_last_flat = book.realized_pnl();
                was_open = false;
            }
            Some(PositionState::Flat) | None => {}
            Some(_) => {
                was_open = true;
            }
        }
    }

    (round_trips, wins)
}
