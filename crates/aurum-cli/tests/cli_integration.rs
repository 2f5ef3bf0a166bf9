use aurum_application::config::load_config;
use aurum_application::history;
use aurum_application::shared::resolve_pair;
use aurum_application::trading::run_tick;
use aurum_domain::repositories::journal::JournalReader;
use aurum_domain::services::ledger;
use aurum_domain::value_objects::position_state::PositionState;
use aurum_infrastructure::broker::SimBroker;
use aurum_infrastructure::journal::CsvJournal;
use aurum_infrastructure::market_data::CsvPriceFeed;
use chrono::{Days, NaiveDate};
use std::fs;
use std::path::PathBuf;

fn write_bars(dir: &PathBuf, symbol: &str, closes: &[f64]) {
    let start = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
    let mut contents = String::from("timestamp_utc,open,high,low,close,volume\n");
    for (idx, close) in closes.iter().enumerate() {
        let day = start.checked_add_days(Days::new(idx as u64)).unwrap();
        contents.push_str(&format!("{},{c},{c},{c},{c},1000\n", day, c = close));
    }
    fs::write(dir.join(format!("{}.csv", symbol)), contents).expect("write bars");
}

fn write_config(root: &PathBuf) -> PathBuf {
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
confirm_filters = false

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
        data_dir = root.join("data").display(),
        state_dir = root.join("state").display(),
    );
    let path = root.join("config.toml");
    fs::write(&path, config_toml).expect("write config");
    path
}

/// The operator workflow across separate process runs: each tick rebuilds
/// its dependencies from config + journal, exactly as the binary does.
#[test]
fn tick_workflow_survives_process_restarts() {
    let root = PathBuf::from("/tmp/aurum_cli_workflow");
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(root.join("data")).expect("create data dir");

    let mut lead = vec![180.0, 180.5, 180.2, 180.8, 180.4, 180.6, 189.0];
    write_bars(&root.join("data"), "GLD", &lead);
    write_bars(&root.join("data"), "GDX", &vec![30.0; lead.len()]);

    let config_path = write_config(&root);
    let (config, config_toml) = load_config(&config_path).expect("config should load");
    let pair = resolve_pair(&config);

    // Process 1: entry tick.
    {
        let journal = CsvJournal::new(root.join("state"));
        let feed = CsvPriceFeed::new(root.join("data"));
        let broker =
            SimBroker::from_trades(config.run.initial_capital, &pair, &journal.read_trades().unwrap());
        let outcome = run_tick(&config, &config_toml, &feed, &broker, &journal).expect("entry");
        assert_eq!(outcome.state, PositionState::Long);
        assert_eq!(outcome.trades.len(), 2);
    }

    // Process 2: fresh deps, next trading day, spread reverted.
    lead.push(180.5);
    write_bars(&root.join("data"), "GLD", &lead);
    write_bars(&root.join("data"), "GDX", &vec![30.0; lead.len()]);
    {
        let journal = CsvJournal::new(root.join("state"));
        let feed = CsvPriceFeed::new(root.join("data"));
        let broker =
            SimBroker::from_trades(config.run.initial_capital, &pair, &journal.read_trades().unwrap());
        let outcome = run_tick(&config, &config_toml, &feed, &broker, &journal).expect("exit");
        assert_eq!(outcome.state, PositionState::Flat);
        assert_eq!(outcome.trades.len(), 2);
    }

    // Journal is consistent and fully flat after the round trip.
    let journal = CsvJournal::new(root.join("state"));
    let trades = journal.read_trades().unwrap();
    let signals = journal.read_signals().unwrap();
    let ledger_state = ledger::replay(&pair, &trades).unwrap();
    assert_eq!(ledger_state.state(), Some(PositionState::Flat));
    ledger::consistent_with_signals(&pair, &trades, &signals).expect("journal consistency");

    let loaded = history::load(&journal).expect("history");
    let summary = history::performance(&config, &loaded);
    assert_eq!(summary.round_trips, 1);
    assert_eq!(summary.trades, 4);
    assert!(summary.net_profit.is_finite());

    // The audit log and config snapshot land next to the journal.
    assert!(root.join("state").join("events.jsonl").exists());
    assert!(root.join("state").join("config_snapshot.toml").exists());
}

#[test]
fn missing_price_data_surfaces_an_error() {
    let root = PathBuf::from("/tmp/aurum_cli_missing_data");
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(root.join("data")).expect("create data dir");
    // Only the lead leg has a file.
    write_bars(&root.join("data"), "GLD", &[180.0, 180.5]);

    let config_path = write_config(&root);
    let (config, config_toml) = load_config(&config_path).expect("config should load");
    let pair = resolve_pair(&config);

    let journal = CsvJournal::new(root.join("state"));
    let feed = CsvPriceFeed::new(root.join("data"));
    let broker = SimBroker::from_trades(config.run.initial_capital, &pair, &[]);
    let err = run_tick(&config, &config_toml, &feed, &broker, &journal)
        .expect_err("tick should fail without lag data");
    assert!(err.contains("failed to open bars CSV"), "err: {err}");
}

#[test]
fn invalid_config_is_rejected_at_load() {
    let root = PathBuf::from("/tmp/aurum_cli_bad_config");
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).expect("create root");
    let path = root.join("config.toml");
    fs::write(&path, "[run]\nrun_id = \"x\"\n").expect("write config");
    let err = load_config(&path).expect_err("expected parse error");
    assert!(err.contains("failed to parse TOML"), "err: {err}");
}
