//! Polling feed over a live exchange.
//!
//! Each poll re-fetches a trailing window, recomputes the pipeline over it,
//! and exposes only the newest bar, once, when its timestamp differs from
//! the last one seen.

use super::canonicalize::canonicalize;
use super::feed::BarFeed;
use super::provider::DataSource;
use crate::domain::{Bar, BarInterval};
use crate::exchange::{ExchangeError, KlineClient};
use crate::indicators::IndicatorPipeline;
use chrono::NaiveDateTime;
use tracing::debug;

pub const DEFAULT_WINDOW: usize = 100;

#[derive(Debug, Clone)]
pub struct LiveFeed {
    symbol: String,
    interval: BarInterval,
    window: usize,
    pipeline: IndicatorPipeline,
    bars: Vec<Bar>,
    last_seen: Option<NaiveDateTime>,
    pending: bool,
    revealed: bool,
}

impl LiveFeed {
    pub fn new(symbol: &str, interval: BarInterval, window: usize, pipeline: IndicatorPipeline) -> Self {
        Self {
            symbol: symbol.to_string(),
            interval,
            window: window.max(2),
            pipeline,
            bars: Vec::new(),
            last_seen: None,
            pending: false,
            revealed: false,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn source(&self) -> DataSource {
        DataSource::Exchange
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn last_seen(&self) -> Option<NaiveDateTime> {
        self.last_seen
    }

    /// Fetch the trailing window. Returns true if a new newest bar appeared.
    pub fn poll(&mut self, client: &mut dyn KlineClient) -> Result<bool, ExchangeError> {
        let raw = client.klines(&self.symbol, self.interval, self.window)?;
        let (raw, _) = canonicalize(raw);
        let newest = match raw.last() {
            Some(bar) => bar.timestamp,
            None => return Ok(false),
        };
        if self.last_seen == Some(newest) {
            return Ok(false);
        }

        self.bars = self.pipeline.apply(&raw);
        self.last_seen = Some(newest);
        self.pending = true;
        self.revealed = false;
        debug!(symbol = %self.symbol, %newest, window = self.bars.len(), "new live bar");
        Ok(true)
    }
}

impl BarFeed for LiveFeed {
    fn has_next(&self) -> bool {
        self.pending
    }

    fn advance(&mut self) -> Option<&Bar> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        self.revealed = true;
        self.bars.last()
    }

    fn latest_bars(&self, n: usize) -> &[Bar] {
        if !self.revealed {
            return &[];
        }
        &self.bars[self.bars.len().saturating_sub(n)..]
    }
}
