//! Integration tests for the live trading loop against a scripted exchange.
//!
//! The exchange reveals one more bar of a fixed zigzag series per poll. With
//! the small parameter set below the series crosses bullish at bar 16 and
//! bearish at bar 20.
//!
//! Tests:
//! 1. No new kline means no step
//! 2. Entry fill becomes a BUY sized from the quote notional; exit SELLs the same quantity
//! 3. An order rejected by the exchange ends the tick with an error
//! 4. Kline failures propagate
//! 5. A window shorter than the indicator warm-up is rejected up front

use chrono::NaiveDate;
use fibcross_core::domain::{BarInterval, RawBar};
use fibcross_core::exchange::{ExchangeError, KlineClient, OrderAck, OrderClient, OrderSide};
use fibcross_core::indicators::{
    IndicatorParams, SlowParams, SmoothingMethod, StageParams,
};
use fibcross_core::strategy::StrategySettings;
use fibcross_runner::config::LiveConfig;
use fibcross_runner::live::LiveTrader;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

const SYMBOL: &str = "ETHBTC";

/// Down 2 for six bars, up 3 for three bars, repeating from 200.
fn zigzag(n: usize) -> Vec<RawBar> {
    let base = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let pattern = [-2.0, -2.0, -2.0, -2.0, -2.0, -2.0, 3.0, 3.0, 3.0];
    let mut close = 200.0;
    (0..n)
        .map(|i| {
            close += pattern[i % pattern.len()];
            RawBar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1.0,
            }
        })
        .collect()
}

fn params() -> IndicatorParams {
    IndicatorParams {
        fib: StageParams {
            lookback: 5,
            smooth: 2,
            method: SmoothingMethod::Simple(3),
        },
        fast: StageParams {
            lookback: 3,
            smooth: 3,
            method: SmoothingMethod::Exponential,
        },
        slow: SlowParams {
            lookback1: 2,
            method1: SmoothingMethod::Exponential,
            lookback2: 3,
            method2: SmoothingMethod::Exponential,
        },
        high: StageParams {
            lookback: 3,
            smooth: 2,
            method: SmoothingMethod::Wilder,
        },
    }
}

#[derive(Default)]
struct MockExchange {
    series: Vec<RawBar>,
    revealed: usize,
    /// When false, every poll returns the same prefix.
    grow: bool,
    reject_orders: bool,
    fail_klines: bool,
    placed: Vec<(String, OrderSide, f64)>,
}

impl MockExchange {
    fn growing(n: usize) -> Self {
        Self {
            series: zigzag(n),
            grow: true,
            ..Self::default()
        }
    }
}

impl KlineClient for MockExchange {
    fn klines(
        &mut self,
        _symbol: &str,
        _interval: BarInterval,
        limit: usize,
    ) -> Result<Vec<RawBar>, ExchangeError> {
        if self.fail_klines {
            return Err(ExchangeError::Network("connection reset".into()));
        }
        if self.grow || self.revealed == 0 {
            self.revealed = (self.revealed + 1).min(self.series.len());
        }
        let visible = &self.series[..self.revealed];
        Ok(visible[visible.len().saturating_sub(limit)..].to_vec())
    }
}

impl OrderClient for MockExchange {
    fn market_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        quantity: f64,
    ) -> Result<OrderAck, ExchangeError> {
        if self.reject_orders {
            return Err(ExchangeError::Rejected {
                status: 400,
                message: "Account has insufficient balance for requested action.".into(),
            });
        }
        self.placed.push((symbol.to_string(), side, quantity));
        Ok(OrderAck {
            symbol: symbol.to_string(),
            order_id: self.placed.len() as u64,
            side,
            quantity,
            status: "FILLED".into(),
        })
    }
}

fn live_config() -> LiveConfig {
    LiveConfig {
        symbols: vec![SYMBOL.to_string()],
        interval: "1h".parse().unwrap(),
        quote_notional: 1000.0,
        poll_interval_secs: 0,
        window: 100,
    }
}

fn trader(exchange: MockExchange) -> LiveTrader<MockExchange> {
    LiveTrader::new(exchange, &live_config(), params(), StrategySettings::default(), 0.002).unwrap()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn unchanged_kline_is_not_stepped_twice() {
    let exchange = MockExchange {
        series: zigzag(30),
        grow: false,
        ..MockExchange::default()
    };
    let mut trader = trader(exchange);
    for _ in 0..5 {
        trader.tick().unwrap();
    }
    assert_eq!(trader.stats(SYMBOL).unwrap().advances, 1);
    assert!(trader.orders().is_empty());
}

#[test]
fn crossover_round_trip_places_buy_then_sell() {
    let mut trader = trader(MockExchange::growing(30));

    // bars 0..=15: no crossover yet
    for _ in 0..16 {
        assert_eq!(trader.tick().unwrap(), 0);
    }
    // bar 16: bullish
    assert_eq!(trader.tick().unwrap(), 1);
    // bars 17..=19
    for _ in 0..3 {
        assert_eq!(trader.tick().unwrap(), 0);
    }
    // bar 20: bearish exit
    assert_eq!(trader.tick().unwrap(), 1);

    let placed = &trader.client().placed;
    assert_eq!(placed.len(), 2);
    let (symbol, side, qty) = &placed[0];
    assert_eq!(symbol, SYMBOL);
    assert_eq!(*side, OrderSide::Buy);
    assert!((qty - 1000.0 / 191.0).abs() < 1e-9);
    assert_eq!(placed[1].1, OrderSide::Sell);
    assert_eq!(placed[1].2, *qty);

    let trades = trader.closed_trades(SYMBOL).unwrap();
    assert_eq!(trades.len(), 1);
    assert!((trades[0].entry_price - 191.0 * 1.002).abs() < 1e-9);
    assert!((trades[0].exit_price - 188.0 * 0.998).abs() < 1e-9);

    let stats = trader.stats(SYMBOL).unwrap();
    assert_eq!(stats.advances, 21);
    assert_eq!(stats.fills, 2);
    assert_eq!(trader.orders().len(), 2);
}

#[test]
fn rejected_order_is_surfaced() {
    let exchange = MockExchange {
        reject_orders: true,
        ..MockExchange::growing(30)
    };
    let mut trader = trader(exchange);
    let mut result = Ok(0);
    for _ in 0..17 {
        result = trader.tick();
        if result.is_err() {
            break;
        }
    }
    let err = result.unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("BUY order"), "{chain}");
    assert!(chain.contains("insufficient balance"), "{chain}");
}

#[test]
fn kline_failure_is_surfaced() {
    let exchange = MockExchange {
        fail_klines: true,
        ..MockExchange::growing(10)
    };
    let mut trader = trader(exchange);
    let err = trader.tick().unwrap_err();
    assert!(format!("{err:#}").contains("failed to poll klines"));
}

#[test]
fn run_stops_after_max_ticks() {
    let mut trader = trader(MockExchange::growing(30));
    trader.run(Some(21)).unwrap();
    assert_eq!(trader.stats(SYMBOL).unwrap().advances, 21);
    assert_eq!(trader.orders().len(), 2);
}

#[test]
fn window_shorter_than_warm_up_is_rejected() {
    let default_params = IndicatorParams::default();
    let warm_up = fibcross_core::indicators::IndicatorPipeline::new(default_params)
        .unwrap()
        .warm_up();
    assert!(warm_up > 30);

    let short = LiveConfig {
        window: 30,
        ..live_config()
    };
    assert!(short.validate().is_ok());
    let err = LiveTrader::new(
        MockExchange::growing(10),
        &short,
        default_params,
        StrategySettings::default(),
        0.002,
    )
    .err()
    .unwrap();
    assert!(format!("{err:#}").contains("too short"), "{err:#}");

    let edge = LiveConfig {
        window: warm_up + 1,
        ..live_config()
    };
    let built = LiveTrader::new(
        MockExchange::growing(10),
        &edge,
        default_params,
        StrategySettings::default(),
        0.002,
    );
    assert!(built.is_err());

    let enough = LiveConfig {
        window: warm_up + 2,
        ..live_config()
    };
    let built = LiveTrader::new(
        MockExchange::growing(10),
        &enough,
        default_params,
        StrategySettings::default(),
        0.002,
    );
    assert!(built.is_ok());
}
