//! Exchange boundary for live trading: kline polling and market orders.
//!
//! The kernel only sees the two traits below; `binance` is the concrete
//! REST client. Failures are typed and always surfaced to the caller.

pub mod binance;

use crate::domain::{BarInterval, RawBar};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use binance::BinanceClient;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("network error: {0}")]
    Network(String),

    #[error("exchange rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Response(String),

    #[error("missing credentials: set {0}")]
    MissingCredentials(&'static str),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("hard stop: exchange has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

/// Acknowledgement of an accepted market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAck {
    pub symbol: String,
    pub order_id: u64,
    pub side: OrderSide,
    pub quantity: f64,
    pub status: String,
}

/// Source of the most recent closed and forming bars for a symbol.
pub trait KlineClient {
    /// Up to `limit` most recent bars, oldest first.
    fn klines(&mut self, symbol: &str, interval: BarInterval, limit: usize)
        -> Result<Vec<RawBar>, ExchangeError>;
}

/// Market order placement.
pub trait OrderClient {
    fn market_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<OrderAck, ExchangeError>;
}

/// Convert a quote-currency notional into base-asset units at `price`.
pub fn base_quantity(quote_notional: f64, price: f64) -> Result<f64, ExchangeError> {
    if !(price.is_finite() && price > 0.0) {
        return Err(ExchangeError::InvalidOrder(format!(
            "reference price must be positive, got {price}"
        )));
    }
    if !(quote_notional.is_finite() && quote_notional > 0.0) {
        return Err(ExchangeError::InvalidOrder(format!(
            "quote notional must be positive, got {quote_notional}"
        )));
    }
    Ok(quote_notional / price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_quantity_converts_notional() {
        let qty = base_quantity(1000.0, 250.0).unwrap();
        assert!((qty - 4.0).abs() < 1e-12);
    }

    #[test]
    fn base_quantity_rejects_bad_price() {
        assert!(base_quantity(1000.0, 0.0).is_err());
        assert!(base_quantity(1000.0, f64::NAN).is_err());
        assert!(base_quantity(-5.0, 10.0).is_err());
    }

    #[test]
    fn order_side_wire_names() {
        assert_eq!(OrderSide::Buy.as_str(), "BUY");
        assert_eq!(serde_json::to_string(&OrderSide::Sell).unwrap(), "\"SELL\"");
    }
}
