use aurum_domain::repositories::broker::BrokerGateway;
use aurum_domain::repositories::journal::Journal;
use aurum_domain::services::audit::AuditEvent;
use aurum_domain::services::ledger;
use aurum_domain::value_objects::order::{OrderIntent, OrderReceipt, OrderStatus};
use aurum_domain::value_objects::pair::PairSpec;
use aurum_domain::value_objects::position_state::PositionState;
use aurum_domain::value_objects::side::Side;
use aurum_domain::value_objects::trade::Trade;
use chrono::NaiveDate;
use serde_json::json;
use std::thread;
use std::time::{Duration, Instant};

const QTY_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct ExecutionConfig {
    pub poll_interval_ms: u64,
    pub fill_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct TransitionPlan {
    pub target: PositionState,
    pub trading_day: NaiveDate,
    pub orders: Vec<OrderIntent>,
}

/// Minimal order sequence from the current signed legs to the target legs.
/// Risk-reducing orders come first; a leg that flips sign closes to zero
/// before reopening. Client order ids are deterministic so an overlapping
/// run resubmits the same orders instead of new ones.
#[allow(clippy::too_many_arguments)]
pub fn plan_transition(
    run_id: &str,
    trading_day: NaiveDate,
    pair: &PairSpec,
    current: (f64, f64),
    target: (f64, f64),
    target_state: PositionState,
    marks: (f64, f64),
) -> TransitionPlan {
    let mut closes: Vec<(String, f64, f64)> = Vec::new();
    let mut opens: Vec<(String, f64, f64)> = Vec::new();

    let legs = [
        (pair.lead.clone(), current.0, target.0, marks.0),
        (pair.lag.clone(), current.1, target.1, marks.1),
    ];
    for (symbol, cur, tgt, mark) in legs {
        let flips = cur > QTY_EPS && tgt < -QTY_EPS || cur < -QTY_EPS && tgt > QTY_EPS;
        if flips {
            closes.push((symbol.clone(), -cur, mark));
            opens.push((symbol, tgt, mark));
            continue;
        }
        let delta = tgt - cur;
        if delta.abs() <= QTY_EPS {
            continue;
        }
        if tgt.abs() < cur.abs() {
            closes.push((symbol, delta, mark));
        } else {
            opens.push((symbol, delta, mark));
        }
    }

    let orders = closes
        .into_iter()
        .chain(opens)
        .enumerate()
        .map(|(seq, (symbol, delta, mark))| {
            let side = if delta > 0.0 { Side::Buy } else { Side::Sell };
            OrderIntent {
                client_order_id: format!(
                    "{}-{}-{}-{}-{}",
                    run_id,
                    trading_day,
                    symbol,
                    side.as_str(),
                    seq
                ),
                symbol,
                side,
                quantity: delta.abs(),
                reference_price: mark,
            }
        })
        .collect();

    TransitionPlan {
        target: target_state,
        trading_day,
        orders,
    }
}

pub struct Executor<'a> {
    broker: &'a dyn BrokerGateway,
    config: ExecutionConfig,
    run_id: String,
    audit_events: Vec<AuditEvent>,
}

impl<'a> Executor<'a> {
    pub fn new(broker: &'a dyn BrokerGateway, config: ExecutionConfig, run_id: String) -> Self {
        Self {
            broker,
            config,
            run_id,
            audit_events: Vec::new(),
        }
    }

    pub fn drain_audit_events(&mut self) -> Vec<AuditEvent> {
        std::mem::take(&mut self.audit_events)
    }

    /// Drives the plan to completion. Each order is submitted (or resumed by
    /// client id), polled to a confirmed fill, and only then journaled as a
    /// Trade. The first failure aborts the remainder; fills confirmed so far
    /// stay journaled and the next tick repairs from the replayed book.
    pub fn execute(
        &mut self,
        plan: &TransitionPlan,
        pair: &PairSpec,
        start_legs: (f64, f64),
        bar_timestamp: i64,
        journal: &dyn Journal,
    ) -> Result<Vec<Trade>, String> {
        let (mut lead_qty, mut lag_qty) = start_legs;
        let mut trades = Vec::new();

        for intent in &plan.orders {
            let receipt = self.submit_or_resume(intent, bar_timestamp)?;
            let receipt = self.await_fill(intent, receipt, bar_timestamp)?;

            let price = receipt.filled_avg_price.unwrap_or(intent.reference_price);
            let timestamp = receipt.filled_at.unwrap_or(bar_timestamp);
            let signed = match intent.side {
                Side::Buy => intent.quantity,
                Side::Sell => -intent.quantity,
            };
            if intent.symbol == pair.lead {
                lead_qty += signed;
            } else {
                lag_qty += signed;
            }
            let resulting_state = ledger::state_of(lead_qty, lag_qty).unwrap_or(plan.target);

            let trade = Trade {
                timestamp,
                trading_day: plan.trading_day,
                symbol: intent.symbol.clone(),
                side: intent.side,
                quantity: intent.quantity,
                price,
                resulting_state,
            };
            journal.append_trade(&trade)?;
            metrics::counter!("aurum.executor.fills").increment(1);
            self.push_event(
                bar_timestamp,
                &intent.symbol,
                "fill",
                None,
                json!({
                    "client_order_id": intent.client_order_id,
                    "side": intent.side.as_str(),
                    "qty": intent.quantity,
                    "price": price,
                    "resulting_state": resulting_state.as_str(),
                }),
            );
            trades.push(trade);
        }

        Ok(trades)
    }

    fn submit_or_resume(
        &mut self,
        intent: &OrderIntent,
        bar_timestamp: i64,
    ) -> Result<OrderReceipt, String> {
        if let Some(existing) = self.broker.order_by_client_id(&intent.client_order_id)? {
            self.push_event(
                bar_timestamp,
                &intent.symbol,
                "resume",
                None,
                json!({
                    "client_order_id": intent.client_order_id,
                    "status": existing.status.as_str(),
                }),
            );
            return Ok(existing);
        }

        match self.broker.submit_order(intent) {
            Ok(receipt) => {
                metrics::counter!("aurum.executor.submits").increment(1);
                self.push_event(
                    bar_timestamp,
                    &intent.symbol,
                    "submit",
                    None,
                    json!({
                        "client_order_id": intent.client_order_id,
                        "side": intent.side.as_str(),
                        "qty": intent.quantity,
                    }),
                );
                Ok(receipt)
            }
            Err(err) => {
                metrics::counter!("aurum.executor.rejects").increment(1);
                self.push_event(
                    bar_timestamp,
                    &intent.symbol,
                    "reject",
                    Some(err.clone()),
                    json!({
                        "client_order_id": intent.client_order_id,
                    }),
                );
                Err(format!(
                    "order submit failed for {}: {}",
                    intent.client_order_id, err
                ))
            }
        }
    }

    fn await_fill(
        &mut self,
        intent: &OrderIntent,
        mut receipt: OrderReceipt,
        bar_timestamp: i64,
    ) -> Result<OrderReceipt, String> {
        let deadline = Instant::now() + Duration::from_millis(self.config.fill_timeout_ms);
        loop {
            if receipt.status == OrderStatus::Filled {
                return Ok(receipt);
            }
            if receipt.status.is_terminal() {
                self.push_event(
                    bar_timestamp,
                    &intent.symbol,
                    "terminal_without_fill",
                    Some(receipt.status.as_str().to_string()),
                    json!({
                        "client_order_id": intent.client_order_id,
                    }),
                );
                return Err(format!(
                    "order {} ended {} without fill",
                    intent.client_order_id,
                    receipt.status.as_str()
                ));
            }
            if Instant::now() >= deadline {
                self.push_event(
                    bar_timestamp,
                    &intent.symbol,
                    "fill_timeout",
                    Some(receipt.status.as_str().to_string()),
                    json!({
                        "client_order_id": intent.client_order_id,
                        "fill_timeout_ms": self.config.fill_timeout_ms,
                    }),
                );
                return Err(format!(
                    "order {} not filled within {}ms (status={})",
                    intent.client_order_id,
                    self.config.fill_timeout_ms,
                    receipt.status.as_str()
                ));
            }
            thread::sleep(Duration::from_millis(self.config.poll_interval_ms));
            receipt = self
                .broker
                .order_by_client_id(&intent.client_order_id)?
                .ok_or_else(|| {
                    format!(
                        "order {} disappeared during fill polling",
                        intent.client_order_id
                    )
                })?;
        }
    }

    fn push_event(
        &mut self,
        timestamp: i64,
        symbol: &str,
        action: &str,
        error: Option<String>,
        details: serde_json::Value,
    ) {
        self.audit_events.push(AuditEvent {
            run_id: self.run_id.clone(),
            timestamp,
            stage: "order".to_string(),
            symbol: Some(symbol.to_string()),
            action: action.to_string(),
            error,
            details,
        });
    }
}
