use crate::config::Config;
use crate::shared::{resolve_metrics_config, resolve_pair};
use aurum_domain::entities::metrics::{summarize, MetricsSummary};
use aurum_domain::repositories::journal::JournalReader;
use aurum_domain::value_objects::equity_point::EquityPoint;
use aurum_domain::value_objects::signal::Signal;
use aurum_domain::value_objects::trade::Trade;

/// Ordered read-only view of the journal: the interface the dashboard (and
/// the report command) consumes. Never mutates state.
#[derive(Debug)]
pub struct History {
    pub signals: Vec<Signal>,
    pub trades: Vec<Trade>,
    pub equity: Vec<EquityPoint>,
}

pub fn load(reader: &dyn JournalReader) -> Result<History, String> {
    let mut signals = reader.read_signals()?;
    let mut trades = reader.read_trades()?;
    let mut equity = reader.read_equity()?;
    signals.sort_by_key(|signal| signal.timestamp);
    trades.sort_by_key(|trade| trade.timestamp);
    equity.sort_by_key(|point| point.timestamp);
    Ok(History {
        signals,
        trades,
        equity,
    })
}

pub fn performance(config: &Config, history: &History) -> MetricsSummary {
    summarize(
        resolve_metrics_config(config),
        &resolve_pair(config),
        config.run.initial_capital,
        &history.trades,
        &history.equity,
    )
}
