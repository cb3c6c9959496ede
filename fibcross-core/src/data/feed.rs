//! Bar feeds: the uniform "next bar" interface the driver replays from.

use super::canonicalize::canonicalize;
use super::provider::{BarSource, DataError, DataSource};
use crate::domain::{Bar, RawBar};
use crate::indicators::IndicatorPipeline;
use tracing::{info, warn};

pub trait BarFeed {
    /// False once the sequence is consumed.
    fn has_next(&self) -> bool;

    /// Reveal the next bar. `None` means exhausted, never an error.
    fn advance(&mut self) -> Option<&Bar>;

    /// Up to `n` most recently revealed bars, oldest first.
    fn latest_bars(&self, n: usize) -> &[Bar];
}

/// Replay of a bounded series with indicators computed once at load.
#[derive(Debug, Clone)]
pub struct HistoricalFeed {
    symbol: String,
    source: DataSource,
    bars: Vec<Bar>,
    cursor: usize,
}

impl HistoricalFeed {
    pub fn load(
        symbol: &str,
        source: &mut dyn BarSource,
        pipeline: &IndicatorPipeline,
    ) -> Result<Self, DataError> {
        let raw = source.load()?;
        let mut feed = Self::from_raw(symbol, raw, pipeline);
        feed.source = source.kind();
        info!(
            %symbol,
            source = source.name(),
            bars = feed.len(),
            warm_up = pipeline.warm_up(),
            "feed ready"
        );
        Ok(feed)
    }

    /// Build from an in-memory series (canonicalized first).
    pub fn from_raw(symbol: &str, raw: Vec<RawBar>, pipeline: &IndicatorPipeline) -> Self {
        let (raw, stats) = canonicalize(raw);
        if stats.duplicates > 0 || stats.reordered {
            warn!(
                %symbol,
                duplicates = stats.duplicates,
                reordered = stats.reordered,
                "source bars were not canonical"
            );
        }
        Self {
            symbol: symbol.to_string(),
            source: DataSource::Memory,
            bars: pipeline.apply(&raw),
            cursor: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Every bar, revealed or not.
    pub fn all_bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Bars revealed so far.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl BarFeed for HistoricalFeed {
    fn has_next(&self) -> bool {
        self.cursor < self.bars.len()
    }

    fn advance(&mut self) -> Option<&Bar> {
        let bar = self.bars.get(self.cursor)?;
        self.cursor += 1;
        Some(bar)
    }

    fn latest_bars(&self, n: usize) -> &[Bar] {
        &self.bars[self.cursor.saturating_sub(n)..self.cursor]
    }
}
