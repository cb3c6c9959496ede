//! Live trading loop: one polling feed, strategy and ledger per symbol.
//!
//! Each tick polls every symbol once. A symbol whose newest kline changed is
//! stepped through the same event chain the backtest uses, and every fill on
//! that tick becomes a market order on the exchange:
//! - entry: `quote_notional / fill reference price` base units, BUY for long, SELL for short
//! - exit: the quantity the entry placed, on the opposite side
//!
//! Order failures end the loop with the exchange error.

use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use fibcross_core::data::{BarFeed, LiveFeed};
use fibcross_core::domain::{ClosedTrade, FillInfo, PositionSide};
use fibcross_core::engine::{Backtester, RunStats};
use fibcross_core::exchange::{base_quantity, KlineClient, OrderAck, OrderClient, OrderSide};
use fibcross_core::indicators::{IndicatorParams, IndicatorPipeline};
use fibcross_core::portfolio::TradeLedger;
use fibcross_core::strategy::{CrossoverStrategy, Strategy, StrategySettings};

use crate::config::LiveConfig;

/// Exchange-side exposure of one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Holding {
    side: PositionSide,
    quantity: f64,
}

struct SymbolSession {
    symbol: String,
    engine: Backtester<LiveFeed, CrossoverStrategy>,
    holding: Option<Holding>,
}

pub struct LiveTrader<C> {
    client: C,
    sessions: Vec<SymbolSession>,
    quote_notional: f64,
    poll_interval: Duration,
    orders: Vec<OrderAck>,
}

impl<C: KlineClient + OrderClient> LiveTrader<C> {
    pub fn new(
        client: C,
        live: &LiveConfig,
        params: IndicatorParams,
        settings: StrategySettings,
        commission: f64,
    ) -> Result<Self> {
        live.validate().context("invalid live config")?;
        let pipeline = IndicatorPipeline::new(params).context("invalid indicator params")?;
        // The crossover reads the last two bars of each polled window.
        if live.window <= pipeline.warm_up().saturating_add(1) {
            bail!(
                "live window {} is too short for the indicator warm-up of {} bars; \
                 no signal could ever be produced (need at least {})",
                live.window,
                pipeline.warm_up(),
                pipeline.warm_up().saturating_add(2)
            );
        }

        let mut sessions = Vec::with_capacity(live.symbols.len());
        for symbol in &live.symbols {
            let feed = LiveFeed::new(symbol, live.interval, live.window, pipeline.clone());
            let ledger = TradeLedger::new(commission).context("invalid commission")?;
            debug!(%symbol, source = ?feed.source(), window = feed.window(), "live session ready");
            sessions.push(SymbolSession {
                symbol: symbol.clone(),
                engine: Backtester::new(feed, CrossoverStrategy::new(settings), ledger),
                holding: None,
            });
        }

        Ok(Self {
            client,
            sessions,
            quote_notional: live.quote_notional,
            poll_interval: Duration::from_secs(live.poll_interval_secs),
            orders: Vec::new(),
        })
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.sessions.iter().map(|s| s.symbol.as_str())
    }

    /// Orders the exchange accepted so far.
    pub fn orders(&self) -> &[OrderAck] {
        &self.orders
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn stats(&self, symbol: &str) -> Option<RunStats> {
        self.session(symbol).map(|s| s.engine.stats())
    }

    /// Closed trades recorded by the symbol's ledger.
    pub fn closed_trades(&self, symbol: &str) -> Option<&[ClosedTrade]> {
        self.session(symbol).map(|s| s.engine.ledger().closed_trades())
    }

    fn session(&self, symbol: &str) -> Option<&SymbolSession> {
        self.sessions.iter().find(|s| s.symbol == symbol)
    }

    /// Poll every symbol once. Returns the number of orders placed.
    pub fn tick(&mut self) -> Result<usize> {
        let mut placed = 0;
        for session in self.sessions.iter_mut() {
            let fresh = session
                .engine
                .feed_mut()
                .poll(&mut self.client)
                .with_context(|| format!("failed to poll klines for {}", session.symbol))?;
            if !fresh || !session.engine.feed().has_next() {
                continue;
            }
            session
                .engine
                .step()
                .with_context(|| format!("live step failed for {}", session.symbol))?;

            let fills: Vec<FillInfo> = session.engine.tick_fills().to_vec();
            for fill in fills {
                let (side, quantity, next) = order_for_fill(&fill, session.holding, self.quote_notional)
                    .with_context(|| format!("cannot size order for {}", session.symbol))?;
                let ack = self
                    .client
                    .market_order(&session.symbol, side, quantity)
                    .with_context(|| {
                        format!("{} order for {} {} failed", side.as_str(), quantity, session.symbol)
                    })?;
                info!(
                    symbol = %session.symbol,
                    side = side.as_str(),
                    quantity,
                    order_id = ack.order_id,
                    status = %ack.status,
                    "order placed"
                );
                session.holding = next;
                self.orders.push(ack);
                placed += 1;
            }
        }
        Ok(placed)
    }

    /// Tick forever, or `max_ticks` times when given, sleeping between polls.
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<()> {
        info!(
            symbols = ?self.symbols().collect::<Vec<_>>(),
            interval_secs = self.poll_interval.as_secs(),
            "live trading started"
        );
        let mut ticks = 0u64;
        loop {
            self.tick()?;
            ticks += 1;
            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            thread::sleep(self.poll_interval);
        }
        for session in &self.sessions {
            if let Some(holding) = session.holding {
                warn!(
                    symbol = %session.symbol,
                    side = ?holding.side,
                    quantity = holding.quantity,
                    strategy = session.engine.strategy().name(),
                    "stopping with an open position"
                );
            }
        }
        Ok(())
    }
}

/// Exchange order for a fill, and the holding after it executes.
fn order_for_fill(
    fill: &FillInfo,
    holding: Option<Holding>,
    quote_notional: f64,
) -> Result<(OrderSide, f64, Option<Holding>)> {
    match PositionSide::from_entry(fill.kind) {
        Some(side) => {
            let quantity = base_quantity(quote_notional, fill.price)?;
            let order_side = match side {
                PositionSide::Long => OrderSide::Buy,
                PositionSide::Short => OrderSide::Sell,
            };
            Ok((order_side, quantity, Some(Holding { side, quantity })))
        }
        None => {
            let holding = holding.context("exit fill without an exchange holding")?;
            let order_side = match holding.side {
                PositionSide::Long => OrderSide::Sell,
                PositionSide::Short => OrderSide::Buy,
            };
            Ok((order_side, holding.quantity, None))
        }
    }
}
