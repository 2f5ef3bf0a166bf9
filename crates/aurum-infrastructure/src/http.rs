use reqwest::blocking::{Client, RequestBuilder, Response};
use std::time::{Duration, Instant};

pub fn build_client(timeout_ms: u64) -> Result<Client, String> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|err| format!("failed to build http client: {err}"))
}

/// Sends a request, retrying transport errors and 5xx responses within the
/// retry budget. Non-5xx responses are returned to the caller for
/// status-specific handling.
pub fn send_with_retry<F>(retries: u32, metric: &'static str, make: F) -> Result<Response, String>
where
    F: Fn() -> RequestBuilder,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    let mut last_error: Option<String> = None;

    while attempts <= retries {
        attempts += 1;
        match make().send() {
            Ok(resp) => {
                if resp.status().is_server_error() && attempts <= retries {
                    tracing::warn!(
                        status = resp.status().as_u16(),
                        attempts,
                        "retrying request after server error"
                    );
                    last_error = Some(format!(
                        "broker http error: status {}",
                        resp.status().as_u16()
                    ));
                    metrics::counter!("aurum.http.retries").increment(1);
                    continue;
                }
                metrics::histogram!(metric).record(start.elapsed().as_millis() as f64);
                return Ok(resp);
            }
            Err(err) => {
                tracing::warn!(error = %err, attempts, "request transport error");
                last_error = Some(format!("broker request failed: {err}"));
                if attempts <= retries {
                    metrics::counter!("aurum.http.retries").increment(1);
                    continue;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| "broker request failed after retries".to_string()))
}

pub fn parse_decimal(value: &str, field: &str) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid decimal for {}: {}", field, value))
}
