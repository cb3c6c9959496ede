//! Backtest driver: pull a bar, drain the bus, repeat until the feed is exhausted.
//!
//! Per tick:
//! 1. `advance()` the feed; `None` ends the run
//! 2. publish `Market`
//! 3. drain: Market → strategy (maybe Signal) then ledger returns;
//!    Signal → Order → Fill → ledger
//!
//! The next bar is never pulled while the bus holds an event.

use super::error::EngineError;
use super::event_bus::EventBus;
use crate::data::{BarFeed, BarSource, HistoricalFeed};
use crate::domain::{ClosedTrade, Event, FillInfo, Position, SignalInfo};
use crate::indicators::{IndicatorParams, IndicatorPipeline};
use crate::portfolio::{ReturnPoint, TradeLedger};
use crate::strategy::{CrossoverStrategy, Strategy, StrategySettings};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Counters collected while the loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub advances: usize,
    pub market_events: usize,
    pub signals: usize,
    pub orders: usize,
    pub fills: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: Vec<ClosedTrade>,
    pub returns: Vec<ReturnPoint>,
    pub signals: Vec<SignalInfo>,
    /// A position still open when the feed ran out.
    pub open_position: Option<Position>,
    pub stats: RunStats,
    pub first_close: Option<f64>,
    pub last_close: Option<f64>,
}

impl RunResult {
    /// `last_close / first_close - 1` over the replayed bars.
    pub fn market_return(&self) -> Option<f64> {
        match (self.first_close, self.last_close) {
            (Some(first), Some(last)) if first != 0.0 => Some(last / first - 1.0),
            _ => None,
        }
    }
}

pub struct Backtester<F, S> {
    feed: F,
    strategy: S,
    ledger: TradeLedger,
    bus: EventBus,
    stats: RunStats,
    signals: Vec<SignalInfo>,
    tick_fills: Vec<FillInfo>,
    first_close: Option<f64>,
    last_close: Option<f64>,
}

impl Backtester<HistoricalFeed, CrossoverStrategy> {
    /// Load `source` once, compute indicators, and wire the crossover strategy.
    pub fn from_source(
        symbol: &str,
        source: &mut dyn BarSource,
        params: IndicatorParams,
        settings: StrategySettings,
        commission: f64,
    ) -> Result<Self, EngineError> {
        let pipeline = IndicatorPipeline::new(params)?;
        let feed = HistoricalFeed::load(symbol, source, &pipeline)?;
        let ledger = TradeLedger::new(commission)?;
        Ok(Self::new(feed, CrossoverStrategy::new(settings), ledger))
    }
}

impl<F: BarFeed, S: Strategy> Backtester<F, S> {
    pub fn new(feed: F, strategy: S, ledger: TradeLedger) -> Self {
        Self {
            feed,
            strategy,
            ledger,
            bus: EventBus::new(),
            stats: RunStats::default(),
            signals: Vec::new(),
            tick_fills: Vec::new(),
            first_close: None,
            last_close: None,
        }
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Live feeds are polled between ticks.
    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Fills applied during the most recent `step`.
    pub fn tick_fills(&self) -> &[FillInfo] {
        &self.tick_fills
    }

    /// One tick. `Ok(false)` once the feed is exhausted.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        debug_assert!(self.bus.is_empty());
        self.tick_fills.clear();
        if !self.feed.has_next() {
            return Ok(false);
        }
        let Some(bar) = self.feed.advance() else {
            return Ok(false);
        };
        self.first_close.get_or_insert(bar.close);
        self.last_close = Some(bar.close);
        self.stats.advances += 1;

        self.bus.publish(Event::Market);
        self.drain()?;
        Ok(true)
    }

    fn drain(&mut self) -> Result<(), EngineError> {
        while let Some(event) = self.bus.next() {
            match event {
                Event::Market => {
                    self.stats.market_events += 1;
                    let window = self.feed.latest_bars(self.strategy.lookback());
                    if let Some(signal) = self.strategy.on_market(window) {
                        self.bus.publish(Event::Signal(signal));
                    }
                    self.ledger.on_market(self.feed.latest_bars(2));
                }
                Event::Signal(signal) => {
                    self.stats.signals += 1;
                    self.signals.push(signal);
                    self.bus.publish(Event::Order(self.ledger.on_signal(signal)));
                }
                Event::Order(order) => {
                    self.stats.orders += 1;
                    self.bus.publish(Event::Fill(self.ledger.on_order(order)));
                }
                Event::Fill(fill) => {
                    self.stats.fills += 1;
                    debug!(kind = %fill.kind, price = fill.fill_price, at = %fill.datetime, "fill");
                    self.ledger.on_fill(fill)?;
                    self.tick_fills.push(fill);
                }
            }
        }
        Ok(())
    }

    /// Run to exhaustion.
    pub fn run(mut self) -> Result<RunResult, EngineError> {
        while self.step()? {}
        info!(
            strategy = self.strategy.name(),
            bars = self.stats.advances,
            signals = self.stats.signals,
            trades = self.ledger.closed_trades().len(),
            "backtest finished"
        );
        let open_position = self.ledger.open_position().cloned();
        let (trades, returns) = self.ledger.into_parts();
        Ok(RunResult {
            trades,
            returns,
            signals: self.signals,
            open_position,
            stats: self.stats,
            first_close: self.first_close,
            last_close: self.last_close,
        })
    }
}
