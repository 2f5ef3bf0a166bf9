use crate::value_objects::order::{OrderIntent, OrderReceipt};

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerPosition {
    pub symbol: String,
    pub quantity: f64,
    pub avg_entry_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub equity: f64,
    pub cash: f64,
}

/// Port to the paper brokerage. Submissions are idempotent per client order
/// id: resubmitting an id the broker has already seen must not create a
/// second order.
pub trait BrokerGateway {
    fn account(&self) -> Result<AccountSnapshot, String>;

    fn open_positions(&self) -> Result<Vec<BrokerPosition>, String>;

    fn submit_order(&self, intent: &OrderIntent) -> Result<OrderReceipt, String>;

    fn order_by_client_id(&self, client_order_id: &str) -> Result<Option<OrderReceipt>, String>;
}
