use aurum_domain::entities::pair_book::PairBook;
use aurum_domain::repositories::broker::{AccountSnapshot, BrokerGateway, BrokerPosition};
use aurum_domain::value_objects::order::{OrderIntent, OrderReceipt, OrderStatus};
use aurum_domain::value_objects::pair::PairSpec;
use aurum_domain::value_objects::side::Side;
use aurum_domain::value_objects::trade::Trade;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct SimState {
    cash: f64,
    positions: Vec<BrokerPosition>,
    orders: Vec<OrderReceipt>,
    fail_submits: u32,
}

/// In-process paper broker: fills market orders instantly at the intent's
/// reference price. Used for broker.mode = "sim" and in tests; submissions
/// are idempotent per client order id like the real gateway.
pub struct SimBroker {
    state: Mutex<SimState>,
}

impl SimBroker {
    pub fn new(cash: f64) -> Self {
        Self {
            state: Mutex::new(SimState {
                cash,
                ..SimState::default()
            }),
        }
    }

    /// Seeds open positions, e.g. from a journal replay, so reconciliation
    /// holds across separate process runs.
    pub fn with_positions(cash: f64, positions: Vec<BrokerPosition>) -> Self {
        let broker = Self::new(cash);
        broker
            .state
            .lock()
            .expect("sim broker state")
            .positions
            .extend(positions.into_iter().filter(|p| p.quantity != 0.0));
        broker
    }

    /// Rebuilds the broker-side book from the trade journal, so a sim-mode
    /// process restart still reconciles against the journal replay.
    pub fn from_trades(initial_cash: f64, pair: &PairSpec, trades: &[Trade]) -> Self {
        let mut book = PairBook::new_with_cash(initial_cash);
        for trade in trades {
            book.apply_fill(&trade.symbol, trade.side, trade.quantity, trade.price);
        }
        let mut positions = Vec::new();
        for symbol in [&pair.lead, &pair.lag] {
            let quantity = book.position_qty(symbol);
            if quantity != 0.0 {
                positions.push(BrokerPosition {
                    symbol: symbol.clone(),
                    quantity,
                    avg_entry_price: book.position_avg_price(symbol),
                });
            }
        }
        Self::with_positions(book.cash(), positions)
    }

    /// Makes the next `count` submissions fail, for failure-path tests.
    pub fn fail_next_submits(&self, count: u32) {
        self.state.lock().expect("sim broker state").fail_submits = count;
    }

    pub fn order_count(&self) -> usize {
        self.state.lock().expect("sim broker state").orders.len()
    }
}

fn apply_to_positions(positions: &mut Vec<BrokerPosition>, intent: &OrderIntent) {
    let delta = match intent.side {
        Side::Buy => intent.quantity,
        Side::Sell => -intent.quantity,
    };
    match positions.iter_mut().find(|p| p.symbol == intent.symbol) {
        Some(position) => {
            position.quantity += delta;
            if position.quantity == 0.0 {
                positions.retain(|p| p.symbol != intent.symbol);
            }
        }
        None => positions.push(BrokerPosition {
            symbol: intent.symbol.clone(),
            quantity: delta,
            avg_entry_price: intent.reference_price,
        }),
    }
}

impl BrokerGateway for SimBroker {
    fn account(&self) -> Result<AccountSnapshot, String> {
        let state = self.state.lock().expect("sim broker state");
        Ok(AccountSnapshot {
            equity: state.cash,
            cash: state.cash,
        })
    }

    fn open_positions(&self) -> Result<Vec<BrokerPosition>, String> {
        Ok(self.state.lock().expect("sim broker state").positions.clone())
    }

    fn submit_order(&self, intent: &OrderIntent) -> Result<OrderReceipt, String> {
        let mut state = self.state.lock().expect("sim broker state");

        if let Some(existing) = state
            .orders
            .iter()
            .find(|order| order.client_order_id == intent.client_order_id)
        {
            return Ok(existing.clone());
        }

        if state.fail_submits > 0 {
            state.fail_submits -= 1;
            return Err(format!(
                "sim broker: injected submit failure for {}",
                intent.client_order_id
            ));
        }

        if !intent.quantity.is_finite() || intent.quantity <= 0.0 {
            return Err(format!(
                "sim broker: rejected non-positive quantity for {}",
                intent.client_order_id
            ));
        }

        let delta = match intent.side {
            Side::Buy => intent.quantity,
            Side::Sell => -intent.quantity,
        };
        state.cash -= delta * intent.reference_price;
        apply_to_positions(&mut state.positions, intent);

        let receipt = OrderReceipt {
            id: format!("sim-{}", state.orders.len() + 1),
            client_order_id: intent.client_order_id.clone(),
            symbol: intent.symbol.clone(),
            side: intent.side,
            quantity: intent.quantity,
            status: OrderStatus::Filled,
            filled_quantity: intent.quantity,
            filled_avg_price: Some(intent.reference_price),
            filled_at: None,
        };
        state.orders.push(receipt.clone());
        Ok(receipt)
    }

    fn order_by_client_id(&self, client_order_id: &str) -> Result<Option<OrderReceipt>, String> {
        Ok(self
            .state
            .lock()
            .expect("sim broker state")
            .orders
            .iter()
            .find(|order| order.client_order_id == client_order_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::SimBroker;
    use aurum_domain::repositories::broker::BrokerGateway;
    use aurum_domain::value_objects::order::{OrderIntent, OrderStatus};
    use aurum_domain::value_objects::side::Side;

    fn intent(symbol: &str, side: Side, qty: f64, id: &str) -> OrderIntent {
        OrderIntent {
            symbol: symbol.to_string(),
            side,
            quantity: qty,
            reference_price: 100.0,
            client_order_id: id.to_string(),
        }
    }

    #[test]
    fn fills_instantly_and_updates_positions() {
        let broker = SimBroker::new(10_000.0);
        let receipt = broker
            .submit_order(&intent("GLD", Side::Buy, 10.0, "a-1"))
            .unwrap();
        assert_eq!(receipt.status, OrderStatus::Filled);

        let positions = broker.open_positions().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity, 10.0);
        assert_eq!(broker.account().unwrap().cash, 9_000.0);
    }

    #[test]
    fn resubmitting_same_client_id_is_idempotent() {
        let broker = SimBroker::new(10_000.0);
        broker
            .submit_order(&intent("GLD", Side::Buy, 10.0, "a-1"))
            .unwrap();
        broker
            .submit_order(&intent("GLD", Side::Buy, 10.0, "a-1"))
            .unwrap();
        assert_eq!(broker.order_count(), 1);
        assert_eq!(broker.open_positions().unwrap()[0].quantity, 10.0);
    }

    #[test]
    fn injected_failure_leaves_positions_untouched() {
        let broker = SimBroker::new(10_000.0);
        broker.fail_next_submits(1);
        assert!(broker
            .submit_order(&intent("GLD", Side::Buy, 10.0, "a-1"))
            .is_err());
        assert!(broker.open_positions().unwrap().is_empty());
        assert!(broker.order_by_client_id("a-1").unwrap().is_none());
    }

    #[test]
    fn selling_through_zero_goes_short() {
        let broker = SimBroker::new(10_000.0);
        broker
            .submit_order(&intent("GDX", Side::Sell, 60.0, "a-1"))
            .unwrap();
        let positions = broker.open_positions().unwrap();
        assert_eq!(positions[0].quantity, -60.0);
    }
}
