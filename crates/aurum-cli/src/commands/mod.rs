use crate::infra;
use aurum_application::config::{load_config, BrokerMode, Config};
use aurum_application::history;
use aurum_application::shared::parse_duration_like;
use aurum_application::trading::{run_tick, TickOutcome};
use aurum_domain::repositories::journal::JournalReader;
use aurum_domain::repositories::market_data::BarsQuery;
use aurum_domain::services::ledger;
use aurum_domain::value_objects::position_state::PositionState;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

pub enum Command {
    Tick { config: PathBuf },
    Schedule { config: PathBuf, every: String },
    Validate { config: PathBuf },
    History { config: PathBuf, limit: usize },
    Report { config: PathBuf },
}

pub fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Tick { config } => run_tick_command(&config),
        Command::Schedule { config, every } => run_schedule(&config, &every),
        Command::Validate { config } => run_validate(&config),
        Command::History { config, limit } => run_history(&config, limit),
        Command::Report { config } => run_report(&config),
    }
}

fn run_tick_command(config_path: &PathBuf) -> Result<(), String> {
    let (config, config_toml) = load_config(config_path)?;
    print_config_summary("tick", &config);

    let deps = infra::build_engine_deps(&config)?;
    let outcome = run_tick(
        &config,
        &config_toml,
        deps.feed.as_ref(),
        deps.broker.as_ref(),
        &deps.journal,
    )?;
    print_outcome(&outcome);
    Ok(())
}

fn run_schedule(config_path: &PathBuf, every: &str) -> Result<(), String> {
    let interval_seconds = parse_duration_like(every)?;
    tracing::info!(every = %every, "scheduler started");
    loop {
        if let Err(err) = run_tick_command(config_path) {
            // The scheduler keeps running; the failure is logged and counted.
            tracing::error!(error = %err, "scheduled tick failed");
            metrics::counter!("aurum.scheduler.failures").increment(1);
        }
        metrics::counter!("aurum.scheduler.ticks").increment(1);
        thread::sleep(Duration::from_secs(interval_seconds as u64));
    }
}

fn run_validate(config_path: &PathBuf) -> Result<(), String> {
    let (config, _) = load_config(config_path)?;
    print_config_summary("validate", &config);

    let feed = infra::build_feed(&config)?;
    for symbol in [&config.pair.lead, &config.pair.lag] {
        let (bars, report) = feed.daily_bars(&BarsQuery {
            symbol: symbol.clone(),
            days: config.data.lookback_days,
        })?;
        println!(
            "bars {}: rows={}, duplicates={}, out_of_order={}, invalid_close={}",
            symbol, bars.len(), report.duplicates, report.out_of_order, report.invalid_close
        );
    }

    let journal = infra::build_journal(&config);
    let trades = journal.read_trades()?;
    let signals = journal.read_signals()?;
    let pair = aurum_application::shared::resolve_pair(&config);
    let ledger_state = ledger::replay(&pair, &trades)?;
    ledger::consistent_with_signals(&pair, &trades, &signals)?;
    println!(
        "journal: signals={}, trades={}, position={}",
        signals.len(),
        trades.len(),
        ledger_state
            .state()
            .map(|state| state.as_str())
            .unwrap_or("UNBALANCED")
    );

    if config.broker.mode == BrokerMode::Alpaca {
        let broker = infra::build_broker(&config, &journal)?;
        let account = broker.account()?;
        println!(
            "broker account: equity={:.2}, cash={:.2}",
            account.equity, account.cash
        );
    }

    Ok(())
}

fn run_history(config_path: &PathBuf, limit: usize) -> Result<(), String> {
    let (config, _) = load_config(config_path)?;
    let journal = infra::build_journal(&config);
    let loaded = history::load(&journal)?;

    println!("signals (last {}):", limit);
    for signal in loaded.signals.iter().rev().take(limit).rev() {
        println!(
            "  {} {} z={:.3} spread={:.3} ({})",
            signal.trading_day,
            signal.state.as_str(),
            signal.zscore,
            signal.spread,
            signal.reason
        );
    }

    println!("trades (last {}):", limit);
    for trade in loaded.trades.iter().rev().take(limit).rev() {
        println!(
            "  {} {} {} {} @ {:.2} -> {}",
            trade.trading_day,
            trade.side.as_str(),
            trade.quantity,
            trade.symbol,
            trade.price,
            trade.resulting_state.as_str()
        );
    }

    if let Some(point) = loaded.equity.last() {
        println!(
            "equity: {:.2} (cash {:.2}, realized {:.2}, unrealized {:.2}) at {}",
            point.equity,
            point.cash,
            point.realized_pnl,
            point.unrealized_pnl,
            format_timestamp(point.timestamp)
        );
    }
    Ok(())
}

fn run_report(config_path: &PathBuf) -> Result<(), String> {
    let (config, _) = load_config(config_path)?;
    let journal = infra::build_journal(&config);
    let loaded = history::load(&journal)?;
    let summary = history::performance(&config, &loaded);

    let report = serde_json::json!({
        "meta": {
            "run_id": config.run.run_id,
            "pair": format!("{}/{}", config.pair.lead, config.pair.lag),
            "start": loaded.equity.first().map(|point| point.timestamp),
            "end": loaded.equity.last().map(|point| point.timestamp),
        },
        "ticks": summary.ticks,
        "trades": summary.trades,
        "round_trips": summary.round_trips,
        "win_rate": summary.win_rate,
        "net_profit": summary.net_profit,
        "sharpe": summary.sharpe,
        "max_drawdown": summary.max_drawdown,
    });
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to serialize report: {}", err))?;
    println!("{}", rendered);
    Ok(())
}

fn print_config_summary(command: &str, config: &Config) {
    println!(
        "aurum: {} (run_id={}, pair={}/{}, initial_capital={})",
        command, config.run.run_id, config.pair.lead, config.pair.lag, config.run.initial_capital
    );
    println!(
        "signal: lookback={}, entry_z={}, exit_z={}, gap_threshold={}, volume_multiplier={}, confirm_filters={}, hold_days={:?}",
        config.signal.lookback,
        config.signal.entry_z,
        config.signal.exit_z,
        config.signal.gap_threshold,
        config.signal.volume_multiplier,
        config.signal.confirm_filters,
        config.signal.hold_days
    );
    println!(
        "sizing: use_vol_scaling={}, max_leverage={}",
        config.sizing.use_vol_scaling, config.sizing.max_leverage
    );
    println!(
        "data: feed={}, lookback_days={}; broker: mode={}, base_url={}",
        config.data.feed, config.data.lookback_days, config.broker.mode, config.broker.base_url
    );
    println!("state: {}", config.paths.state_dir);
}

fn print_outcome(outcome: &TickOutcome) {
    println!(
        "tick {}: {} z={:.3} spread={:.3} ({})",
        outcome.trading_day,
        outcome.state.as_str(),
        outcome.zscore,
        outcome.spread,
        outcome.reason
    );
    if outcome.guarded {
        println!("orders: suppressed, already traded this trading day");
    } else if outcome.trades.is_empty() {
        println!("orders: none");
    } else {
        for trade in &outcome.trades {
            println!(
                "  {} {} {} @ {:.2} -> {}",
                trade.side.as_str(),
                trade.quantity,
                trade.symbol,
                trade.price,
                trade.resulting_state.as_str()
            );
        }
    }
    if outcome.state == PositionState::Flat && outcome.reason == "insufficient_history" {
        println!("note: not enough aligned history for the lookback window");
    }
    println!(
        "equity: {:.2} (cash {:.2}) at {}",
        outcome.equity.equity,
        outcome.equity.cash,
        format_timestamp(outcome.equity.timestamp)
    );
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
