use crate::config::Config;
use crate::executor::{self, ExecutionConfig, Executor};
use crate::shared::{
    config_fingerprint, resolve_pair, resolve_signal_config, resolve_sizing_config,
};
use aurum_domain::entities::pair_book::PairBook;
use aurum_domain::repositories::broker::BrokerGateway;
use aurum_domain::repositories::journal::Journal;
use aurum_domain::repositories::market_data::{BarsQuery, DataQualityReport, PriceFeed};
use aurum_domain::services::audit::AuditEvent;
use aurum_domain::services::ledger::{self, LedgerState};
use aurum_domain::services::signal::{Decision, SignalEngine};
use aurum_domain::services::sizing::{size_entry, LegSizes};
use aurum_domain::services::spread::SpreadSeries;
use aurum_domain::value_objects::bar::trading_day_from_timestamp;
use aurum_domain::value_objects::equity_point::EquityPoint;
use aurum_domain::value_objects::pair::PairSpec;
use aurum_domain::value_objects::position_state::PositionState;
use aurum_domain::value_objects::signal::Signal;
use aurum_domain::value_objects::trade::Trade;
use chrono::NaiveDate;
use serde_json::json;
use std::time::Instant;
use tracing::info_span;

const RECONCILE_EPS: f64 = 1e-6;

#[derive(Debug)]
pub struct TickOutcome {
    pub trading_day: NaiveDate,
    pub state: PositionState,
    pub spread: f64,
    pub zscore: f64,
    pub reason: String,
    pub orders_submitted: usize,
    pub trades: Vec<Trade>,
    pub equity: EquityPoint,
    pub guarded: bool,
}

/// One scheduled evaluation: load bars, decide, reconcile, trade to the
/// target state, journal everything. Audit events are appended even when the
/// tick fails so the failure is visible to the dashboard as well as the
/// invoker.
pub fn run_tick(
    config: &Config,
    config_toml: &str,
    feed: &dyn PriceFeed,
    broker: &dyn BrokerGateway,
    journal: &dyn Journal,
) -> Result<TickOutcome, String> {
    let mut events = Vec::new();
    let result = run_tick_inner(config, config_toml, feed, broker, journal, &mut events);

    if let Err(err) = &result {
        events.push(AuditEvent {
            run_id: config.run.run_id.clone(),
            timestamp: 0,
            stage: "tick".to_string(),
            symbol: None,
            action: "error".to_string(),
            error: Some(err.clone()),
            details: json!({}),
        });
    }
    let append_result = journal.append_events(&events);
    result.and_then(|outcome| append_result.map(|_| outcome))
}

fn run_tick_inner(
    config: &Config,
    config_toml: &str,
    feed: &dyn PriceFeed,
    broker: &dyn BrokerGateway,
    journal: &dyn Journal,
    events: &mut Vec<AuditEvent>,
) -> Result<TickOutcome, String> {
    let run_id = config.run.run_id.clone();
    let pair = resolve_pair(config);
    let _span = info_span!("run_tick", run_id = %run_id, pair = %pair.label()).entered();

    let stage_start = Instant::now();
    let (lead_bars, lead_report) = feed.daily_bars(&BarsQuery {
        symbol: pair.lead.clone(),
        days: config.data.lookback_days,
    })?;
    let (lag_bars, lag_report) = feed.daily_bars(&BarsQuery {
        symbol: pair.lag.clone(),
        days: config.data.lookback_days,
    })?;
    metrics::histogram!("aurum.tick.load_bars_ms").record(stage_start.elapsed().as_millis() as f64);

    let series = SpreadSeries::from_bars(&lead_bars, &lag_bars, config.signal.lookback)?;
    let Some(latest_ts) = series.latest_timestamp() else {
        return Err(format!("no aligned price data for pair {}", pair.label()));
    };
    let trading_day = trading_day_from_timestamp(latest_ts)?;
    let (lead_close, lag_close) = series
        .latest_closes()
        .ok_or_else(|| "no aligned closes for pair".to_string())?;

    events.push(quality_event(&run_id, latest_ts, &pair.lead, &lead_report));
    events.push(quality_event(&run_id, latest_ts, &pair.lag, &lag_report));
    for (symbol, report) in [(&pair.lead, &lead_report), (&pair.lag, &lag_report)] {
        if report.duplicates > 0 || report.out_of_order > 0 || report.invalid_close > 0 {
            tracing::warn!(
                symbol = %symbol,
                duplicates = report.duplicates,
                out_of_order = report.out_of_order,
                invalid_close = report.invalid_close,
                "data quality issues in daily bars"
            );
        }
    }

    let prior_trades = journal.read_trades()?;
    let ledger_state = ledger::replay(&pair, &prior_trades)?;
    reconcile(broker, &pair, &ledger_state)?;

    let stats = series.latest();
    let engine = SignalEngine::new(resolve_signal_config(config));
    let current_state = ledger_state.state();

    let mut decision = match current_state {
        Some(current) => {
            let held_days = ledger_state
                .entered_day
                .map(|day| (trading_day - day).num_days());
            engine.evaluate(stats.as_ref(), current, held_days)
        }
        None => {
            // Interrupted transition left a one-legged book: close the stray
            // exposure and let the next tick evaluate from a clean state.
            tracing::warn!(
                lead_qty = ledger_state.lead_qty,
                lag_qty = ledger_state.lag_qty,
                "unbalanced book from interrupted transition, repairing to flat"
            );
            Decision {
                state: PositionState::Flat,
                spread: stats.as_ref().map(|s| s.spread).unwrap_or(0.0),
                zscore: stats.as_ref().map(|s| s.zscore).unwrap_or(0.0),
                reason: "repair_unbalanced".to_string(),
            }
        }
    };

    let mut entry_sizes: Option<LegSizes> = None;
    if decision.state.is_open() && current_state == Some(PositionState::Flat) {
        let stats_ref = stats
            .as_ref()
            .ok_or_else(|| "entry decided without spread statistics".to_string())?;
        let sizes = size_entry(&resolve_sizing_config(config), stats_ref)?;
        if sizes.is_tradeable() {
            entry_sizes = Some(sizes);
        } else {
            events.push(AuditEvent {
                run_id: run_id.clone(),
                timestamp: latest_ts,
                stage: "sizing".to_string(),
                symbol: None,
                action: "reject".to_string(),
                error: Some("sizing_below_one_share".to_string()),
                details: json!({
                    "lead_qty": sizes.lead_qty,
                    "lag_qty": sizes.lag_qty,
                    "scale": sizes.scale,
                }),
            });
            decision = Decision {
                state: PositionState::Flat,
                spread: decision.spread,
                zscore: decision.zscore,
                reason: "sizing_below_one_share".to_string(),
            };
        }
    }

    let signal = Signal {
        timestamp: latest_ts,
        trading_day,
        state: decision.state,
        spread: decision.spread,
        zscore: decision.zscore,
        reason: decision.reason.clone(),
    };
    journal.append_signal(&signal)?;
    metrics::gauge!("aurum.signal.zscore").set(decision.zscore);
    events.push(AuditEvent {
        run_id: run_id.clone(),
        timestamp: latest_ts,
        stage: "signal".to_string(),
        symbol: None,
        action: decision.reason.clone(),
        error: None,
        details: json!({
            "state": decision.state.as_str(),
            "spread": decision.spread,
            "zscore": decision.zscore,
            "trading_day": trading_day.to_string(),
        }),
    });

    let needs_transition = match current_state {
        Some(current) => decision.state != current,
        None => true,
    };
    // Idempotency per trading day: once a run has traded on a trading day,
    // an overlapping or repeated run must not trade again that day. Repairing
    // a one-legged book is exempt so an interrupted transition can be undone
    // the same day.
    let already_traded_today = prior_trades
        .iter()
        .any(|trade| trade.trading_day == trading_day);
    let guarded =
        needs_transition && already_traded_today && decision.reason != "repair_unbalanced";

    let mut new_trades: Vec<Trade> = Vec::new();
    let mut orders_submitted = 0usize;
    if needs_transition && !guarded {
        let target_legs = match decision.state {
            PositionState::Long => {
                let sizes = entry_sizes
                    .as_ref()
                    .ok_or_else(|| "long entry without sizes".to_string())?;
                (sizes.lead_qty, -sizes.lag_qty)
            }
            PositionState::Short => {
                let sizes = entry_sizes
                    .as_ref()
                    .ok_or_else(|| "short entry without sizes".to_string())?;
                (-sizes.lead_qty, sizes.lag_qty)
            }
            PositionState::Flat => (0.0, 0.0),
        };

        let plan = executor::plan_transition(
            &run_id,
            trading_day,
            &pair,
            (ledger_state.lead_qty, ledger_state.lag_qty),
            target_legs,
            decision.state,
            (lead_close, lag_close),
        );
        orders_submitted = plan.orders.len();

        let stage_start = Instant::now();
        let mut order_executor = Executor::new(
            broker,
            ExecutionConfig {
                poll_interval_ms: config.broker.poll_interval_ms,
                fill_timeout_ms: config.broker.fill_timeout_ms,
            },
            run_id.clone(),
        );
        let execution = order_executor.execute(
            &plan,
            &pair,
            (ledger_state.lead_qty, ledger_state.lag_qty),
            latest_ts,
            journal,
        );
        events.append(&mut order_executor.drain_audit_events());
        metrics::histogram!("aurum.tick.execute_ms")
            .record(stage_start.elapsed().as_millis() as f64);
        new_trades = execution?;
    } else if guarded {
        tracing::warn!(
            trading_day = %trading_day,
            target = decision.state.as_str(),
            "transition suppressed: already traded this trading day"
        );
        events.push(AuditEvent {
            run_id: run_id.clone(),
            timestamp: latest_ts,
            stage: "guard".to_string(),
            symbol: None,
            action: "already_traded_today".to_string(),
            error: None,
            details: json!({
                "trading_day": trading_day.to_string(),
                "target": decision.state.as_str(),
            }),
        });
    }

    let mut all_trades = prior_trades;
    all_trades.extend(new_trades.iter().cloned());
    let mut book = PairBook::new_with_cash(config.run.initial_capital);
    for trade in &all_trades {
        book.apply_fill(&trade.symbol, trade.side, trade.quantity, trade.price);
    }
    let marks = [(pair.lead.as_str(), lead_close), (pair.lag.as_str(), lag_close)];
    let point = EquityPoint {
        timestamp: latest_ts,
        equity: book.equity(&marks)?,
        cash: book.cash(),
        realized_pnl: book.realized_pnl(),
        unrealized_pnl: book.unrealized_pnl(&marks)?,
    };
    let duplicate_tick = new_trades.is_empty()
        && journal
            .read_equity()?
            .last()
            .map(|last| last.timestamp == latest_ts)
            .unwrap_or(false);
    if !duplicate_tick {
        journal.append_equity(&point)?;
    }
    metrics::gauge!("aurum.tick.equity").set(point.equity);
    metrics::gauge!("aurum.tick.trades_total").set(all_trades.len() as f64);

    journal.write_config_snapshot(config_toml)?;
    events.push(AuditEvent {
        run_id,
        timestamp: latest_ts,
        stage: "tick".to_string(),
        symbol: None,
        action: "complete".to_string(),
        error: None,
        details: json!({
            "trading_day": trading_day.to_string(),
            "state": decision.state.as_str(),
            "orders_submitted": orders_submitted,
            "new_trades": new_trades.len(),
            "equity": point.equity,
            "guarded": guarded,
            "config_fingerprint": config_fingerprint(config_toml),
        }),
    });

    Ok(TickOutcome {
        trading_day,
        state: decision.state,
        spread: decision.spread,
        zscore: decision.zscore,
        reason: decision.reason,
        orders_submitted,
        trades: new_trades,
        equity: point,
        guarded,
    })
}

fn reconcile(
    broker: &dyn BrokerGateway,
    pair: &PairSpec,
    ledger_state: &LedgerState,
) -> Result<(), String> {
    let positions = broker.open_positions()?;
    let broker_qty = |symbol: &str| {
        positions
            .iter()
            .find(|position| position.symbol == symbol)
            .map(|position| position.quantity)
            .unwrap_or(0.0)
    };

    let broker_lead = broker_qty(&pair.lead);
    let broker_lag = broker_qty(&pair.lag);
    if (broker_lead - ledger_state.lead_qty).abs() > RECONCILE_EPS
        || (broker_lag - ledger_state.lag_qty).abs() > RECONCILE_EPS
    {
        return Err(format!(
            "position reconciliation failed: broker holds {}={}, {}={} but journal replays {}={}, {}={}",
            pair.lead,
            broker_lead,
            pair.lag,
            broker_lag,
            pair.lead,
            ledger_state.lead_qty,
            pair.lag,
            ledger_state.lag_qty
        ));
    }
    Ok(())
}

fn quality_event(
    run_id: &str,
    timestamp: i64,
    symbol: &str,
    report: &DataQualityReport,
) -> AuditEvent {
    AuditEvent {
        run_id: run_id.to_string(),
        timestamp,
        stage: "data".to_string(),
        symbol: Some(symbol.to_string()),
        action: "quality".to_string(),
        error: None,
        details: json!({
            "rows": report.rows,
            "duplicates": report.duplicates,
            "out_of_order": report.out_of_order,
            "invalid_close": report.invalid_close,
            "first_timestamp": report.first_timestamp,
            "last_timestamp": report.last_timestamp,
        }),
    }
}
