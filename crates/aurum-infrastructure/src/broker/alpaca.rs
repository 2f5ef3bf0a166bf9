use crate::http::{build_client, parse_decimal, send_with_retry};
use aurum_domain::repositories::broker::{AccountSnapshot, BrokerGateway, BrokerPosition};
use aurum_domain::value_objects::order::{OrderIntent, OrderReceipt, OrderStatus};
use aurum_domain::value_objects::side::Side;
use chrono::DateTime;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::env;

pub const KEY_ID_ENV: &str = "APCA_API_KEY_ID";
pub const SECRET_KEY_ENV: &str = "APCA_API_SECRET_KEY";

/// Alpaca-shaped paper brokerage over its REST API. Orders are market,
/// good-till-canceled, identified by caller-provided client order ids.
pub struct AlpacaBroker {
    base_url: String,
    key_id: String,
    secret_key: String,
    retries: u32,
    client: Client,
}

impl AlpacaBroker {
    pub fn new(
        base_url: String,
        key_id: String,
        secret_key: String,
        timeout_ms: u64,
        retries: u32,
    ) -> Result<Self, String> {
        if key_id.trim().is_empty() || secret_key.trim().is_empty() {
            return Err("broker credentials must not be empty".to_string());
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id,
            secret_key,
            retries,
            client: build_client(timeout_ms)?,
        })
    }

    pub fn from_env(base_url: String, timeout_ms: u64, retries: u32) -> Result<Self, String> {
        let key_id = env::var(KEY_ID_ENV)
            .map_err(|_| format!("missing broker credentials: env {} is not set", KEY_ID_ENV))?;
        let secret_key = env::var(SECRET_KEY_ENV).map_err(|_| {
            format!("missing broker credentials: env {} is not set", SECRET_KEY_ENV)
        })?;
        Self::new(base_url, key_id, secret_key, timeout_ms, retries)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
    }
}

#[derive(Debug, Deserialize)]
struct AlpacaAccount {
    cash: String,
    equity: String,
}

#[derive(Debug, Deserialize)]
struct AlpacaPosition {
    symbol: String,
    qty: String,
    avg_entry_price: String,
}

#[derive(Debug, Deserialize)]
struct AlpacaOrder {
    id: String,
    client_order_id: String,
    symbol: String,
    qty: String,
    side: String,
    status: String,
    filled_qty: String,
    filled_avg_price: Option<String>,
    filled_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewOrderRequest {
    symbol: String,
    qty: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    client_order_id: String,
}

fn to_receipt(order: AlpacaOrder) -> Result<OrderReceipt, String> {
    let filled_avg_price = match order.filled_avg_price.as_deref() {
        Some(raw) => Some(parse_decimal(raw, "filled_avg_price")?),
        None => None,
    };
    let filled_at = match order.filled_at.as_deref() {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|err| format!("invalid filled_at {}: {}", raw, err))?
                .timestamp(),
        ),
        None => None,
    };
    Ok(OrderReceipt {
        id: order.id,
        client_order_id: order.client_order_id,
        symbol: order.symbol,
        side: Side::parse(&order.side)?,
        quantity: parse_decimal(&order.qty, "qty")?,
        status: OrderStatus::parse(&order.status)?,
        filled_quantity: parse_decimal(&order.filled_qty, "filled_qty")?,
        filled_avg_price,
        filled_at,
    })
}

impl BrokerGateway for AlpacaBroker {
    fn account(&self) -> Result<AccountSnapshot, String> {
        let url = format!("{}/v2/account", self.base_url);
        let resp = send_with_retry(self.retries, "aurum.broker.account_ms", || {
            self.authed(self.client.get(&url))
        })?;
        if resp.status() != StatusCode::OK {
            return Err(format!(
                "account request failed: status {}",
                resp.status().as_u16()
            ));
        }
        let parsed: AlpacaAccount = resp
            .json()
            .map_err(|err| format!("failed to parse account response: {err}"))?;
        Ok(AccountSnapshot {
            equity: parse_decimal(&parsed.equity, "equity")?,
            cash: parse_decimal(&parsed.cash, "cash")?,
        })
    }

    fn open_positions(&self) -> Result<Vec<BrokerPosition>, String> {
        let url = format!("{}/v2/positions", self.base_url);
        let resp = send_with_retry(self.retries, "aurum.broker.positions_ms", || {
            self.authed(self.client.get(&url))
        })?;
        if resp.status() != StatusCode::OK {
            return Err(format!(
                "positions request failed: status {}",
                resp.status().as_u16()
            ));
        }
        let parsed: Vec<AlpacaPosition> = resp
            .json()
            .map_err(|err| format!("failed to parse positions response: {err}"))?;
        parsed
            .into_iter()
            .map(|position| {
                Ok(BrokerPosition {
                    quantity: parse_decimal(&position.qty, "qty")?,
                    avg_entry_price: parse_decimal(&position.avg_entry_price, "avg_entry_price")?,
                    symbol: position.symbol,
                })
            })
            .collect()
    }

    fn submit_order(&self, intent: &OrderIntent) -> Result<OrderReceipt, String> {
        let url = format!("{}/v2/orders", self.base_url);
        let body = NewOrderRequest {
            symbol: intent.symbol.clone(),
            qty: format!("{}", intent.quantity),
            side: match intent.side {
                Side::Buy => "buy",
                Side::Sell => "sell",
            },
            order_type: "market",
            time_in_force: "gtc",
            client_order_id: intent.client_order_id.clone(),
        };
        let resp = send_with_retry(self.retries, "aurum.broker.submit_ms", || {
            self.authed(self.client.post(&url)).json(&body)
        })?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().unwrap_or_default();
            return Err(format!(
                "order submit rejected for {}: status {} {}",
                intent.client_order_id,
                status.as_u16(),
                detail
            ));
        }
        let parsed: AlpacaOrder = resp
            .json()
            .map_err(|err| format!("failed to parse order response: {err}"))?;
        to_receipt(parsed)
    }

    fn order_by_client_id(&self, client_order_id: &str) -> Result<Option<OrderReceipt>, String> {
        let url = format!("{}/v2/orders:by_client_order_id", self.base_url);
        let resp = send_with_retry(self.retries, "aurum.broker.lookup_ms", || {
            self.authed(
                self.client
                    .get(&url)
                    .query(&[("client_order_id", client_order_id)]),
            )
        })?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if resp.status() != StatusCode::OK {
            return Err(format!(
                "order lookup failed for {}: status {}",
                client_order_id,
                resp.status().as_u16()
            ));
        }
        let parsed: AlpacaOrder = resp
            .json()
            .map_err(|err| format!("failed to parse order response: {err}"))?;
        to_receipt(parsed).map(Some)
    }
}
