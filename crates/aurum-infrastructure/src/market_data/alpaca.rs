use crate::http::{build_client, send_with_retry};
use crate::market_data::parse_timestamp;
use aurum_domain::repositories::market_data::{
    data_quality_from_bars, BarsQuery, DataQualityReport, PriceFeed,
};
use aurum_domain::value_objects::bar::Bar;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

/// Daily bars from the brokerage's market-data API
/// (`GET /v2/stocks/{symbol}/bars?timeframe=1Day`).
pub struct AlpacaBarsFeed {
    data_url: String,
    key_id: String,
    secret_key: String,
    retries: u32,
    client: Client,
}

impl AlpacaBarsFeed {
    pub fn new(
        data_url: String,
        key_id: String,
        secret_key: String,
        timeout_ms: u64,
        retries: u32,
    ) -> Result<Self, String> {
        Ok(Self {
            data_url: data_url.trim_end_matches('/').to_string(),
            key_id,
            secret_key,
            retries,
            client: build_client(timeout_ms)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireBar {
    #[serde(rename = "t")]
    timestamp: String,
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v")]
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    bars: Option<Vec<WireBar>>,
}

impl PriceFeed for AlpacaBarsFeed {
    fn daily_bars(&self, query: &BarsQuery) -> Result<(Vec<Bar>, DataQualityReport), String> {
        let url = format!("{}/v2/stocks/{}/bars", self.data_url, query.symbol);
        let limit = query.days.to_string();
        let resp = send_with_retry(self.retries, "aurum.feed.bars_ms", || {
            self.client
                .get(&url)
                .header("APCA-API-KEY-ID", &self.key_id)
                .header("APCA-API-SECRET-KEY", &self.secret_key)
                .query(&[
                    ("timeframe", "1Day"),
                    ("limit", limit.as_str()),
                    ("adjustment", "split"),
                ])
        })?;
        if resp.status() != StatusCode::OK {
            return Err(format!(
                "bars request failed for {}: status {}",
                query.symbol,
                resp.status().as_u16()
            ));
        }
        let parsed: BarsResponse = resp
            .json()
            .map_err(|err| format!("failed to parse bars response: {err}"))?;

        let mut bars = Vec::new();
        for wire in parsed.bars.unwrap_or_default() {
            bars.push(Bar {
                symbol: query.symbol.clone(),
                timestamp: parse_timestamp(&wire.timestamp)?,
                open: wire.open,
                high: wire.high,
                low: wire.low,
                close: wire.close,
                volume: wire.volume,
            });
        }

        let report = data_quality_from_bars(&bars);
        Ok((bars, report))
    }
}
