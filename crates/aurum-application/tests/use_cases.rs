use aurum_application::config::{load_config, Config};
use aurum_application::history;
use aurum_application::trading::run_tick;
use aurum_domain::repositories::broker::{BrokerGateway, BrokerPosition};
use aurum_domain::repositories::journal::JournalReader;
use aurum_domain::services::ledger;
use aurum_domain::value_objects::pair::PairSpec;
use aurum_domain::value_objects::position_state::PositionState;
use aurum_domain::value_objects::side::Side;
use aurum_domain::value_objects::trade::Trade;
use aurum_infrastructure::broker::SimBroker;
use aurum_infrastructure::journal::CsvJournal;
use aurum_infrastructure::market_data::CsvPriceFeed;
use chrono::{Days, NaiveDate};
use std::fs;
use std::path::PathBuf;

const BASE_LEAD: [f64; 6] = [180.0, 180.5, 180.2, 180.8, 180.4, 180.6];
const SPIKE: f64 = 189.0;
const REVERT: f64 = 180.5;

struct Harness {
    root: PathBuf,
    config: Config,
    config_toml: String,
    feed: CsvPriceFeed,
    journal: CsvJournal,
}

impl Harness {
    fn new(name: &str, confirm_filters: bool) -> Self {
        let root = PathBuf::from("/tmp").join(name);
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("data")).expect("create data dir");

        let config_toml = format!(
            r#"
[run]
run_id = "gld_gdx_paper"
initial_capital = 1000000.0

[pair]
lead = "GLD"
lag = "GDX"

[signal]
lookback = 5
entry_z = 1.0
exit_z = 0.5
gap_threshold = 0.01
volume_multiplier = 1.2
confirm_filters = {confirm_filters}

[sizing]
use_vol_scaling = false
max_leverage = 3.0

[data]
feed = "csv"
csv_dir = "{data_dir}"
lookback_days = 30

[broker]
mode = "sim"
base_url = "https://paper-api.alpaca.markets"
timeout_ms = 5000
retries = 1
poll_interval_ms = 1
fill_timeout_ms = 100

[paths]
state_dir = "{state_dir}"
"#,
            confirm_filters = confirm_filters,
            data_dir = root.join("data").display(),
            state_dir = root.join("state").display(),
        );
        let config_path = root.join("config.toml");
        fs::write(&config_path, &config_toml).expect("write config");
        let (config, config_toml) = load_config(&config_path).expect("config should load");

        Self {
            feed: CsvPriceFeed::new(root.join("data")),
            journal: CsvJournal::new(root.join("state")),
            root,
            config,
            config_toml,
        }
    }

    fn write_bars(&self, symbol: &str, rows: &[(f64, f64)]) {
        let start = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        let mut contents = String::from("timestamp_utc,open,high,low,close,volume\n");
        for (idx, (close, volume)) in rows.iter().enumerate() {
            let day = start.checked_add_days(Days::new(idx as u64)).unwrap();
            contents.push_str(&format!("{},{c},{c},{c},{c},{v}\n", day, c = close, v = volume));
        }
        fs::write(self.root.join("data").join(format!("{}.csv", symbol)), contents)
            .expect("write bars");
    }

    fn write_pair_bars(&self, lead_closes: &[f64], lead_volumes: &[f64]) {
        let lead: Vec<(f64, f64)> = lead_closes
            .iter()
            .zip(lead_volumes)
            .map(|(close, volume)| (*close, *volume))
            .collect();
        let lag: Vec<(f64, f64)> = (0..lead_closes.len()).map(|_| (30.0, 900.0)).collect();
        self.write_bars("GLD", &lead);
        self.write_bars("GDX", &lag);
    }

    fn tick(&self, broker: &SimBroker) -> Result<aurum_application::trading::TickOutcome, String> {
        run_tick(
            &self.config,
            &self.config_toml,
            &self.feed,
            broker,
            &self.journal,
        )
    }
}

fn spike_series() -> (Vec<f64>, Vec<f64>) {
    let mut closes = BASE_LEAD.to_vec();
    closes.push(SPIKE);
    let volumes = vec![1_000.0; closes.len()];
    (closes, volumes)
}

#[test]
fn insufficient_history_degrades_to_flat_with_no_orders() {
    let harness = Harness::new("aurum_uc_insufficient", false);
    harness.write_pair_bars(&BASE_LEAD[..4], &[1_000.0; 4]);
    let broker = SimBroker::new(1_000_000.0);

    let outcome = harness.tick(&broker).expect("tick should succeed");
    assert_eq!(outcome.state, PositionState::Flat);
    assert_eq!(outcome.reason, "insufficient_history");
    assert_eq!(outcome.orders_submitted, 0);
    assert_eq!(broker.order_count(), 0);

    let signals = harness.journal.read_signals().unwrap();
    assert_eq!(signals.len(), 1);
    assert!(harness.journal.read_trades().unwrap().is_empty());
    assert_eq!(harness.journal.read_equity().unwrap().len(), 1);
}

#[test]
fn threshold_crossing_enters_then_exits_exactly_once() {
    let harness = Harness::new("aurum_uc_round_trip", false);
    let (closes, volumes) = spike_series();
    harness.write_pair_bars(&closes, &volumes);
    let broker = SimBroker::new(1_000_000.0);

    let entry = harness.tick(&broker).expect("entry tick");
    assert_eq!(entry.state, PositionState::Long);
    assert_eq!(entry.reason, "entry_long");
    assert_eq!(entry.trades.len(), 2);
    assert_eq!(entry.trades[0].symbol, "GLD");
    assert_eq!(entry.trades[0].side, Side::Buy);
    assert_eq!(entry.trades[1].symbol, "GDX");
    assert_eq!(entry.trades[1].side, Side::Sell);

    // Next day the spread reverts inside the exit threshold.
    let mut extended = closes.clone();
    extended.push(REVERT);
    let mut extended_volumes = volumes.clone();
    extended_volumes.push(1_000.0);
    harness.write_pair_bars(&extended, &extended_volumes);

    let exit = harness.tick(&broker).expect("exit tick");
    assert_eq!(exit.state, PositionState::Flat);
    assert_eq!(exit.reason, "exit_threshold");
    assert_eq!(exit.trades.len(), 2);

    let trades = harness.journal.read_trades().unwrap();
    assert_eq!(trades.len(), 4);
    let ledger_state = ledger::replay(&PairSpec::new("GLD", "GDX"), &trades).unwrap();
    assert_eq!(ledger_state.state(), Some(PositionState::Flat));

    let signals = harness.journal.read_signals().unwrap();
    let states: Vec<PositionState> = signals.iter().map(|signal| signal.state).collect();
    assert_eq!(states, vec![PositionState::Long, PositionState::Flat]);

    ledger::consistent_with_signals(&PairSpec::new("GLD", "GDX"), &trades, &signals)
        .expect("trades must be backed by signals");

    assert_eq!(harness.journal.read_equity().unwrap().len(), 2);
    assert!(broker.open_positions().unwrap().is_empty());
}

#[test]
fn rerun_on_same_day_produces_zero_orders() {
    let harness = Harness::new("aurum_uc_idempotent", false);
    let (closes, volumes) = spike_series();
    harness.write_pair_bars(&closes, &volumes);
    let broker = SimBroker::new(1_000_000.0);

    let first = harness.tick(&broker).expect("first tick");
    assert_eq!(first.trades.len(), 2);
    let orders_after_first = broker.order_count();

    let second = harness.tick(&broker).expect("second tick");
    assert_eq!(second.state, PositionState::Long);
    assert_eq!(second.reason, "hold");
    assert!(second.trades.is_empty());
    assert_eq!(broker.order_count(), orders_after_first);

    // The duplicate evaluation is journaled; the equity row is not repeated.
    assert_eq!(harness.journal.read_signals().unwrap().len(), 2);
    assert_eq!(harness.journal.read_equity().unwrap().len(), 1);
}

#[test]
fn confirmation_filters_gate_entry_on_volume() {
    let blocked = Harness::new("aurum_uc_filters_blocked", true);
    let (closes, volumes) = spike_series();
    blocked.write_pair_bars(&closes, &volumes);
    let broker = SimBroker::new(1_000_000.0);
    let outcome = blocked.tick(&broker).expect("tick");
    // z-score crosses but relative volume stays at 1.0.
    assert_eq!(outcome.state, PositionState::Flat);
    assert_eq!(outcome.reason, "no_entry");
    assert_eq!(broker.order_count(), 0);

    let confirmed = Harness::new("aurum_uc_filters_confirmed", true);
    let mut spiked_volumes = volumes.clone();
    *spiked_volumes.last_mut().unwrap() = 2_000.0;
    confirmed.write_pair_bars(&closes, &spiked_volumes);
    let broker = SimBroker::new(1_000_000.0);
    let outcome = confirmed.tick(&broker).expect("tick");
    assert_eq!(outcome.state, PositionState::Long);
    assert_eq!(outcome.trades.len(), 2);
}

#[test]
fn broker_failure_leaves_position_state_unchanged() {
    let harness = Harness::new("aurum_uc_broker_failure", false);
    let (closes, volumes) = spike_series();
    harness.write_pair_bars(&closes, &volumes);
    let broker = SimBroker::new(1_000_000.0);
    broker.fail_next_submits(1);

    let err = harness.tick(&broker).expect_err("tick should fail");
    assert!(err.contains("order submit failed"), "err: {err}");

    let trades = harness.journal.read_trades().unwrap();
    assert!(trades.is_empty());
    let ledger_state = ledger::replay(&PairSpec::new("GLD", "GDX"), &trades).unwrap();
    assert_eq!(ledger_state.state(), Some(PositionState::Flat));
    assert!(broker.open_positions().unwrap().is_empty());

    // The next run recovers and completes the entry.
    let recovered = harness.tick(&broker).expect("recovery tick");
    assert_eq!(recovered.state, PositionState::Long);
    assert_eq!(recovered.trades.len(), 2);
}

#[test]
fn unbalanced_journal_is_repaired_to_flat() {
    let harness = Harness::new("aurum_uc_repair", false);
    let (closes, volumes) = spike_series();
    harness.write_pair_bars(&closes, &volumes);

    // An interrupted earlier run filled only the lead leg today.
    let trading_day = NaiveDate::from_ymd_opt(2026, 7, 7).unwrap();
    let stray = Trade {
        timestamp: 1_753_000_000,
        trading_day,
        symbol: "GLD".to_string(),
        side: Side::Buy,
        quantity: 10.0,
        price: 189.0,
        resulting_state: PositionState::Long,
    };
    {
        use aurum_domain::repositories::journal::JournalWriter;
        harness.journal.append_trade(&stray).unwrap();
    }
    let broker = SimBroker::with_positions(
        1_000_000.0,
        vec![BrokerPosition {
            symbol: "GLD".to_string(),
            quantity: 10.0,
            avg_entry_price: 189.0,
        }],
    );

    let outcome = harness.tick(&broker).expect("repair tick");
    assert_eq!(outcome.state, PositionState::Flat);
    assert_eq!(outcome.reason, "repair_unbalanced");
    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].side, Side::Sell);

    let trades = harness.journal.read_trades().unwrap();
    let ledger_state = ledger::replay(&PairSpec::new("GLD", "GDX"), &trades).unwrap();
    assert_eq!(ledger_state.state(), Some(PositionState::Flat));
    assert!(broker.open_positions().unwrap().is_empty());
}

#[test]
fn reconciliation_mismatch_aborts_the_tick() {
    let harness = Harness::new("aurum_uc_reconcile", false);
    let (closes, volumes) = spike_series();
    harness.write_pair_bars(&closes, &volumes);

    // Broker holds a position the journal knows nothing about.
    let broker = SimBroker::with_positions(
        1_000_000.0,
        vec![BrokerPosition {
            symbol: "GLD".to_string(),
            quantity: 5.0,
            avg_entry_price: 180.0,
        }],
    );

    let err = harness.tick(&broker).expect_err("tick should fail");
    assert!(err.contains("reconciliation"), "err: {err}");
    assert!(harness.journal.read_trades().unwrap().is_empty());
}

#[test]
fn history_accessor_returns_ordered_series() {
    let harness = Harness::new("aurum_uc_history", false);
    let (closes, volumes) = spike_series();
    harness.write_pair_bars(&closes, &volumes);
    let broker = SimBroker::new(1_000_000.0);
    harness.tick(&broker).expect("entry tick");

    let mut extended = closes.clone();
    extended.push(REVERT);
    let mut extended_volumes = volumes.clone();
    extended_volumes.push(1_000.0);
    harness.write_pair_bars(&extended, &extended_volumes);
    harness.tick(&broker).expect("exit tick");

    let loaded = history::load(&harness.journal).expect("history should load");
    assert_eq!(loaded.signals.len(), 2);
    assert_eq!(loaded.trades.len(), 4);
    assert_eq!(loaded.equity.len(), 2);
    assert!(loaded
        .trades
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    assert!(loaded
        .equity
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));

    let summary = history::performance(&harness.config, &loaded);
    assert_eq!(summary.ticks, 2);
    assert_eq!(summary.trades, 4);
    assert_eq!(summary.round_trips, 1);
}
