use crate::services::audit::AuditEvent;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::signal::Signal;
use crate::value_objects::trade::Trade;

/// Append-only persistence for the trading history. Records are immutable
/// once written.
pub trait JournalWriter {
    fn append_signal(&self, signal: &Signal) -> Result<(), String>;

    fn append_trade(&self, trade: &Trade) -> Result<(), String>;

    fn append_equity(&self, point: &EquityPoint) -> Result<(), String>;

    fn append_events(&self, events: &[AuditEvent]) -> Result<(), String>;

    fn write_config_snapshot(&self, contents: &str) -> Result<(), String>;
}

/// Read side consumed by the pipeline (replay, same-day guard) and by the
/// external dashboard.
pub trait JournalReader {
    fn read_signals(&self) -> Result<Vec<Signal>, String>;

    fn read_trades(&self) -> Result<Vec<Trade>, String>;

    fn read_equity(&self) -> Result<Vec<EquityPoint>, String>;
}

pub trait Journal: JournalWriter + JournalReader {}

impl<T: JournalWriter + JournalReader> Journal for T {}
