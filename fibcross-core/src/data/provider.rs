//! Bar source trait and structured error types.
//!
//! The `BarSource` trait abstracts over where bars come from (Yahoo chart API,
//! CSV file, in-memory series) so feeds can swap implementations and tests can
//! mock them.

use crate::domain::RawBar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("no bars for {symbol} between {start} and {end}")]
    NoBarsInRange {
        symbol: String,
        start: String,
        end: String,
    },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    #[error("csv error in {path}: {message}")]
    Csv { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvFile,
    Exchange,
    Memory,
}

/// Anything that can produce a bounded OHLCV series.
///
/// Sources are not required to sort or dedupe; `HistoricalFeed` canonicalizes.
pub trait BarSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn kind(&self) -> DataSource;

    /// Fetch the full series.
    fn load(&mut self) -> Result<Vec<RawBar>, DataError>;
}

/// A fixed in-memory series.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    bars: Vec<RawBar>,
}

impl MemorySource {
    pub fn new(bars: Vec<RawBar>) -> Self {
        Self { bars }
    }
}

impl BarSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn kind(&self) -> DataSource {
        DataSource::Memory
    }

    fn load(&mut self) -> Result<Vec<RawBar>, DataError> {
        Ok(self.bars.clone())
    }
}

impl<S: BarSource + ?Sized> BarSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn kind(&self) -> DataSource {
        (**self).kind()
    }

    fn load(&mut self) -> Result<Vec<RawBar>, DataError> {
        (**self).load()
    }
}
