use crate::value_objects::side::Side;

#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub reference_price: f64,
    pub client_order_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Rejected,
    Canceled,
    Expired,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "new",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.to_lowercase().as_str() {
            "new" | "accepted" | "pending_new" => Ok(OrderStatus::New),
            "partially_filled" => Ok(OrderStatus::PartiallyFilled),
            "filled" => Ok(OrderStatus::Filled),
            "rejected" => Ok(OrderStatus::Rejected),
            "canceled" | "pending_cancel" => Ok(OrderStatus::Canceled),
            "expired" => Ok(OrderStatus::Expired),
            _ => Err(format!("unsupported order status: {}", value)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Rejected | OrderStatus::Canceled | OrderStatus::Expired
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderReceipt {
    pub id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub status: OrderStatus,
    pub filled_quantity: f64,
    pub filled_avg_price: Option<f64>,
    pub filled_at: Option<i64>,
}
