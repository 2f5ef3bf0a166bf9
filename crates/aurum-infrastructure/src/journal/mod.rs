use aurum_domain::repositories::journal::{JournalReader, JournalWriter};
use aurum_domain::services::audit::AuditEvent;
use aurum_domain::value_objects::equity_point::EquityPoint;
use aurum_domain::value_objects::position_state::PositionState;
use aurum_domain::value_objects::side::Side;
use aurum_domain::value_objects::signal::Signal;
use aurum_domain::value_objects::trade::Trade;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const SIGNALS_FILE: &str = "signals.csv";
const TRADES_FILE: &str = "trades.csv";
const EQUITY_FILE: &str = "equity.csv";
const EVENTS_FILE: &str = "events.jsonl";
const CONFIG_SNAPSHOT_FILE: &str = "config_snapshot.toml";

const SIGNALS_HEADER: [&str; 6] = [
    "timestamp_utc",
    "trading_day",
    "state",
    "spread",
    "zscore",
    "reason",
];
const TRADES_HEADER: [&str; 7] = [
    "timestamp_utc",
    "trading_day",
    "symbol",
    "side",
    "qty",
    "price",
    "resulting_state",
];
const EQUITY_HEADER: [&str; 5] = [
    "timestamp_utc",
    "equity",
    "cash",
    "realized_pnl",
    "unrealized_pnl",
];

/// Append-only journal on the filesystem: one CSV per record type plus an
/// events JSONL, all under a single state directory.
#[derive(Debug, Clone)]
pub struct CsvJournal {
    dir: PathBuf,
}

impl CsvJournal {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.dir)
            .map_err(|err| format!("failed to create state dir {}: {}", self.dir.display(), err))
    }

    fn append_row(&self, file_name: &str, header: &[&str], row: &[String]) -> Result<(), String> {
        self.ensure_dir()?;
        let path = self.dir.join(file_name);
        let needs_header = fs::metadata(&path).map(|meta| meta.len() == 0).unwrap_or(true);
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| format!("failed to open {}: {}", path.display(), err))?;
        let mut writer = csv::Writer::from_writer(file);
        if needs_header {
            writer
                .write_record(header)
                .map_err(|err| format!("failed to write header to {}: {}", path.display(), err))?;
        }
        writer
            .write_record(row)
            .map_err(|err| format!("failed to write row to {}: {}", path.display(), err))?;
        writer
            .flush()
            .map_err(|err| format!("failed to flush {}: {}", path.display(), err))
    }
}

#[derive(Debug, Deserialize)]
struct SignalRecord {
    timestamp_utc: i64,
    trading_day: String,
    state: String,
    spread: f64,
    zscore: f64,
    reason: String,
}

#[derive(Debug, Deserialize)]
struct TradeRecord {
    timestamp_utc: i64,
    trading_day: String,
    symbol: String,
    side: String,
    qty: f64,
    price: f64,
    resulting_state: String,
}

#[derive(Debug, Deserialize)]
struct EquityRecord {
    timestamp_utc: i64,
    equity: f64,
    cash: f64,
    realized_pnl: f64,
    unrealized_pnl: f64,
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| format!("invalid trading_day {}: {}", value, err))
}

fn read_csv<T, F, R>(path: &Path, convert: F) -> Result<Vec<R>, String>
where
    T: for<'de> Deserialize<'de>,
    F: Fn(T) -> Result<R, String>,
{
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| format!("failed to open {}: {}", path.display(), err))?;
    let mut out = Vec::new();
    for result in reader.deserialize::<T>() {
        let record = result
            .map_err(|err| format!("failed to parse row in {}: {}", path.display(), err))?;
        out.push(convert(record)?);
    }
    Ok(out)
}

impl JournalWriter for CsvJournal {
    fn append_signal(&self, signal: &Signal) -> Result<(), String> {
        self.append_row(
            SIGNALS_FILE,
            &SIGNALS_HEADER,
            &[
                signal.timestamp.to_string(),
                signal.trading_day.to_string(),
                signal.state.as_str().to_string(),
                signal.spread.to_string(),
                signal.zscore.to_string(),
                signal.reason.clone(),
            ],
        )
    }

    fn append_trade(&self, trade: &Trade) -> Result<(), String> {
        self.append_row(
            TRADES_FILE,
            &TRADES_HEADER,
            &[
                trade.timestamp.to_string(),
                trade.trading_day.to_string(),
                trade.symbol.clone(),
                trade.side.as_str().to_string(),
                trade.quantity.to_string(),
                trade.price.to_string(),
                trade.resulting_state.as_str().to_string(),
            ],
        )
    }

    fn append_equity(&self, point: &EquityPoint) -> Result<(), String> {
        self.append_row(
            EQUITY_FILE,
            &EQUITY_HEADER,
            &[
                point.timestamp.to_string(),
                point.equity.to_string(),
                point.cash.to_string(),
                point.realized_pnl.to_string(),
                point.unrealized_pnl.to_string(),
            ],
        )
    }

    fn append_events(&self, events: &[AuditEvent]) -> Result<(), String> {
        if events.is_empty() {
            return Ok(());
        }
        self.ensure_dir()?;
        let path = self.dir.join(EVENTS_FILE);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| format!("failed to open {}: {}", path.display(), err))?;
        for event in events {
            let line = serde_json::to_string(event)
                .map_err(|err| format!("failed to serialize audit event: {}", err))?;
            file.write_all(line.as_bytes())
                .and_then(|_| file.write_all(b"\n"))
                .map_err(|err| format!("failed to write audit event: {}", err))?;
        }
        Ok(())
    }

    fn write_config_snapshot(&self, contents: &str) -> Result<(), String> {
        self.ensure_dir()?;
        let path = self.dir.join(CONFIG_SNAPSHOT_FILE);
        fs::write(&path, contents)
            .map_err(|err| format!("failed to write config snapshot {}: {}", path.display(), err))
    }
}

impl JournalReader for CsvJournal {
    fn read_signals(&self) -> Result<Vec<Signal>, String> {
        read_csv(&self.dir.join(SIGNALS_FILE), |record: SignalRecord| {
            Ok(Signal {
                timestamp: record.timestamp_utc,
                trading_day: parse_day(&record.trading_day)?,
                state: PositionState::parse(&record.state)?,
                spread: record.spread,
                zscore: record.zscore,
                reason: record.reason,
            })
        })
    }

    fn read_trades(&self) -> Result<Vec<Trade>, String> {
        read_csv(&self.dir.join(TRADES_FILE), |record: TradeRecord| {
            Ok(Trade {
                timestamp: record.timestamp_utc,
                trading_day: parse_day(&record.trading_day)?,
                symbol: record.symbol,
                side: Side::parse(&record.side)?,
                quantity: record.qty,
                price: record.price,
                resulting_state: PositionState::parse(&record.resulting_state)?,
            })
        })
    }

    fn read_equity(&self) -> Result<Vec<EquityPoint>, String> {
        read_csv(&self.dir.join(EQUITY_FILE), |record: EquityRecord| {
            Ok(EquityPoint {
                timestamp: record.timestamp_utc,
                equity: record.equity,
                cash: record.cash,
                realized_pnl: record.realized_pnl,
                unrealized_pnl: record.unrealized_pnl,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::CsvJournal;
    use aurum_domain::repositories::journal::{JournalReader, JournalWriter};
    use aurum_domain::services::audit::AuditEvent;
    use aurum_domain::value_objects::position_state::PositionState;
    use aurum_domain::value_objects::side::Side;
    use aurum_domain::value_objects::signal::Signal;
    use aurum_domain::value_objects::trade::Trade;
    use chrono::NaiveDate;
    use std::fs;
    use std::path::PathBuf;

    fn fresh_journal(name: &str) -> CsvJournal {
        let dir = PathBuf::from("/tmp").join(name);
        let _ = fs::remove_dir_all(&dir);
        CsvJournal::new(dir)
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn signal_append_read_round_trip() {
        let journal = fresh_journal("aurum_journal_signals");
        let signal = Signal {
            timestamp: 1_754_000_000,
            trading_day: day("2026-08-05"),
            state: PositionState::Long,
            spread: 150.2,
            zscore: 1.42,
            reason: "entry_long".to_string(),
        };
        journal.append_signal(&signal).unwrap();
        journal
            .append_signal(&Signal {
                state: PositionState::Flat,
                reason: "exit_threshold".to_string(),
                ..signal.clone()
            })
            .unwrap();

        let signals = journal.read_signals().unwrap();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0], signal);
        assert_eq!(signals[1].state, PositionState::Flat);
    }

    #[test]
    fn trade_append_read_round_trip() {
        let journal = fresh_journal("aurum_journal_trades");
        let trade = Trade {
            timestamp: 1_754_000_000,
            trading_day: day("2026-08-05"),
            symbol: "GLD".to_string(),
            side: Side::Buy,
            quantity: 100.0,
            price: 181.25,
            resulting_state: PositionState::Long,
        };
        journal.append_trade(&trade).unwrap();
        let trades = journal.read_trades().unwrap();
        assert_eq!(trades, vec![trade]);
    }

    #[test]
    fn empty_journal_reads_empty() {
        let journal = fresh_journal("aurum_journal_empty");
        assert!(journal.read_signals().unwrap().is_empty());
        assert!(journal.read_trades().unwrap().is_empty());
        assert!(journal.read_equity().unwrap().is_empty());
    }

    #[test]
    fn events_are_appended_as_jsonl() {
        let journal = fresh_journal("aurum_journal_events");
        let event = AuditEvent {
            run_id: "gld_gdx".to_string(),
            timestamp: 1,
            stage: "tick".to_string(),
            symbol: None,
            action: "start".to_string(),
            error: None,
            details: serde_json::json!({}),
        };
        journal.append_events(&[event.clone()]).unwrap();
        journal.append_events(&[event]).unwrap();

        let contents = fs::read_to_string(journal.dir().join("events.jsonl")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
