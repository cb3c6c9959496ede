//! Binance spot REST client.
//!
//! Public `/api/v3/klines` for polling, signed `/api/v3/order` for market
//! orders. Signatures are HMAC-SHA256 over the query string, hex encoded.
//! Credentials come from `BINANCE_API_KEY` / `BINANCE_API_SECRET`.

use super::{ExchangeError, KlineClient, OrderAck, OrderClient, OrderSide};
use crate::data::circuit_breaker::CircuitBreaker;
use crate::domain::{BarInterval, RawBar};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_VAR: &str = "BINANCE_API_KEY";
pub const API_SECRET_VAR: &str = "BINANCE_API_SECRET";
const DEFAULT_BASE_URL: &str = "https://api.binance.com";
const MAX_KLINE_LIMIT: usize = 1000;

#[derive(Clone)]
struct Credentials {
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    symbol: String,
    order_id: u64,
    status: String,
    executed_qty: Option<String>,
}

pub struct BinanceClient {
    http: reqwest::blocking::Client,
    base_url: String,
    credentials: Option<Credentials>,
    circuit_breaker: CircuitBreaker,
    max_retries: u32,
    base_delay: Duration,
    recv_window_ms: u64,
}

impl BinanceClient {
    /// Public-endpoint client; orders need `with_credentials`.
    pub fn new() -> Result<Self, ExchangeError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ExchangeError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: None,
            circuit_breaker: CircuitBreaker::default_provider(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            recv_window_ms: 5000,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_credentials(mut self, api_key: &str, api_secret: &str) -> Self {
        self.credentials = Some(Credentials {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        });
        self
    }

    /// Client with credentials read from the environment. Both must be set.
    pub fn from_env() -> Result<Self, ExchangeError> {
        let key = std::env::var(API_KEY_VAR).map_err(|_| ExchangeError::MissingCredentials(API_KEY_VAR))?;
        let secret =
            std::env::var(API_SECRET_VAR).map_err(|_| ExchangeError::MissingCredentials(API_SECRET_VAR))?;
        Ok(Self::new()?.with_credentials(&key, &secret))
    }

    fn sign(secret: &str, query: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ExchangeError::InvalidOrder(format!("invalid API secret: {e}")))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Send with backoff. Only failures where the request cannot have
    /// reached the matching engine are retried when `idempotent` is false.
    fn send(
        &mut self,
        build: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
        idempotent: bool,
    ) -> Result<String, ExchangeError> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                warn!(attempt, ?delay, "retrying exchange request");
                std::thread::sleep(delay);
            }
            if !self.circuit_breaker.is_allowed() {
                return Err(ExchangeError::CircuitBreakerTripped);
            }

            match build(&self.http).send() {
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp
                        .text()
                        .map_err(|e| ExchangeError::Response(format!("unreadable body: {e}")))?;

                    // 418: IP banned after ignoring 429s
                    if status == reqwest::StatusCode::IM_A_TEAPOT
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        self.circuit_breaker.trip();
                        return Err(ExchangeError::CircuitBreakerTripped);
                    }
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(rejection(status.as_u16(), &body));
                        if idempotent {
                            continue;
                        }
                        break;
                    }
                    if !status.is_success() {
                        return Err(rejection(status.as_u16(), &body));
                    }
                    self.circuit_breaker.record_success();
                    return Ok(body);
                }
                Err(e) => {
                    let retryable = e.is_connect() || (idempotent && e.is_timeout());
                    last_error = Some(ExchangeError::Network(e.to_string()));
                    if !retryable {
                        break;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ExchangeError::Network("max retries exceeded".into())))
    }
}

fn rejection(status: u16, body: &str) -> ExchangeError {
    let message = serde_json::from_str::<ApiError>(body)
        .map(|e| format!("{} (code {})", e.msg, e.code))
        .unwrap_or_else(|_| body.to_string());
    ExchangeError::Rejected { status, message }
}

/// Decimal quantity without exponent or trailing zeros.
pub fn format_quantity(quantity: f64) -> String {
    let text = format!("{quantity:.8}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Parse the kline array format: `[open_time_ms, "open", "high", "low", "close", "volume", ...]`.
fn parse_klines(body: &str) -> Result<Vec<RawBar>, ExchangeError> {
    let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(body)
        .map_err(|e| ExchangeError::Response(format!("kline payload: {e}")))?;

    let number = |row: &[serde_json::Value], i: usize| -> Result<f64, ExchangeError> {
        let value = row
            .get(i)
            .ok_or_else(|| ExchangeError::Response(format!("kline row too short ({} fields)", row.len())))?;
        match value {
            serde_json::Value::String(s) => s
                .parse::<f64>()
                .map_err(|_| ExchangeError::Response(format!("non-numeric kline field '{s}'"))),
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| ExchangeError::Response(format!("kline field {n} out of range"))),
            other => Err(ExchangeError::Response(format!("unexpected kline field {other}"))),
        }
    };

    rows.iter()
        .map(|row| {
            let open_ms = row
                .first()
                .and_then(|v| v.as_i64())
                .ok_or_else(|| ExchangeError::Response("kline open time missing".into()))?;
            let timestamp = chrono::DateTime::from_timestamp_millis(open_ms)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| ExchangeError::Response(format!("invalid kline time {open_ms}")))?;
            Ok(RawBar {
                timestamp,
                open: number(row, 1)?,
                high: number(row, 2)?,
                low: number(row, 3)?,
                close: number(row, 4)?,
                volume: number(row, 5)?,
            })
        })
        .collect()
}

impl KlineClient for BinanceClient {
    fn klines(
        &mut self,
        symbol: &str,
        interval: BarInterval,
        limit: usize,
    ) -> Result<Vec<RawBar>, ExchangeError> {
        let url = format!(
            "{}/api/v3/klines?symbol={symbol}&interval={}&limit={}",
            self.base_url,
            interval.binance_code(),
            limit.clamp(1, MAX_KLINE_LIMIT)
        );
        let body = self.send(|http| http.get(&url), true)?;
        let bars = parse_klines(&body)?;
        debug!(%symbol, %interval, bars = bars.len(), "polled klines");
        Ok(bars)
    }
}

impl OrderClient for BinanceClient {
    fn market_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<OrderAck, ExchangeError> {
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(ExchangeError::InvalidOrder(format!(
                "quantity must be positive, got {quantity}"
            )));
        }
        let credentials = self
            .credentials
            .clone()
            .ok_or(ExchangeError::MissingCredentials(API_KEY_VAR))?;

        let query = format!(
            "symbol={symbol}&side={}&type=MARKET&quantity={}&recvWindow={}&timestamp={}",
            side.as_str(),
            format_quantity(quantity),
            self.recv_window_ms,
            chrono::Utc::now().timestamp_millis()
        );
        let signature = Self::sign(&credentials.api_secret, &query)?;
        let url = format!("{}/api/v3/order?{query}&signature={signature}", self.base_url);

        let body = self.send(
            |http| http.post(&url).header("X-MBX-APIKEY", &credentials.api_key),
            false,
        )?;
        let resp: OrderResponse = serde_json::from_str(&body)
            .map_err(|e| ExchangeError::Response(format!("order payload: {e}")))?;

        let filled = resp
            .executed_qty
            .as_deref()
            .and_then(|q| q.parse::<f64>().ok())
            .unwrap_or(quantity);
        info!(%symbol, side = side.as_str(), quantity = filled, order_id = resp.order_id, status = %resp.status, "market order accepted");

        Ok(OrderAck {
            symbol: resp.symbol,
            order_id: resp.order_id,
            side,
            quantity: filled,
            status: resp.status,
        })
    }
}
