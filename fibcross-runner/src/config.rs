//! Serializable backtest configuration.
//!
//! One TOML file describes a run: symbol, interval, commission, where bars
//! come from, the indicator parameter groups, the strategy switches and the
//! live-trading loop. Every table is optional and falls back to defaults.

use chrono::NaiveDate;
use fibcross_core::domain::BarInterval;
use fibcross_core::indicators::{IndicatorParams, ParamsError};
use fibcross_core::portfolio::TradeLedger;
use fibcross_core::strategy::{IntradayError, StrategySettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("empty symbol")]
    EmptySymbol,

    #[error("commission must be a fraction in [0, 1), got {0}")]
    BadCommission(f64),

    #[error("start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Indicators(#[from] ParamsError),

    #[error(transparent)]
    Intraday(#[from] IntradayError),

    #[error("live: {0}")]
    Live(String),
}

/// Where historical bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Yahoo { start: NaiveDate, end: NaiveDate },
    Csv { path: PathBuf },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Yahoo {
            start: NaiveDate::from_ymd_opt(2021, 1, 4).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2021, 1, 20).unwrap_or(NaiveDate::MIN),
        }
    }
}

/// Live polling and order sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub symbols: Vec<String>,
    pub interval: BarInterval,
    /// Quote-currency amount spent per entry.
    pub quote_notional: f64,
    pub poll_interval_secs: u64,
    /// Klines fetched per poll.
    pub window: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["ETHBTC".to_string(), "BTCUSDT".to_string()],
            interval: BarInterval::new(1, fibcross_core::domain::IntervalUnit::Hour),
            quote_notional: 1000.0,
            poll_interval_secs: 1,
            window: fibcross_core::data::live::DEFAULT_WINDOW,
        }
    }
}

impl LiveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() || self.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Live("symbols must be non-empty".into()));
        }
        if !(self.quote_notional.is_finite() && self.quote_notional > 0.0) {
            return Err(ConfigError::Live(format!(
                "quote_notional must be positive, got {}",
                self.quote_notional
            )));
        }
        if self.window < 2 {
            return Err(ConfigError::Live(format!("window must be >= 2, got {}", self.window)));
        }
        Ok(())
    }
}

/// Serializable configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub symbol: String,
    pub interval: BarInterval,
    pub commission: f64,
    pub source: SourceConfig,
    pub indicators: IndicatorParams,
    pub strategy: StrategySettings,
    pub live: LiveConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            symbol: "AAPL".to_string(),
            interval: BarInterval::new(1, fibcross_core::domain::IntervalUnit::Minute),
            commission: TradeLedger::DEFAULT_COMMISSION,
            source: SourceConfig::default(),
            indicators: IndicatorParams::default(),
            strategy: StrategySettings::default(),
            live: LiveConfig::default(),
        }
    }
}

impl BacktestConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks everything the backtest path needs; the live table is checked
    /// separately by [`LiveConfig::validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::EmptySymbol);
        }
        if !(self.commission.is_finite() && (0.0..1.0).contains(&self.commission)) {
            return Err(ConfigError::BadCommission(self.commission));
        }
        if let SourceConfig::Yahoo { start, end } = self.source {
            if start > end {
                return Err(ConfigError::InvertedRange { start, end });
            }
        }
        self.indicators.validate()?;
        if let Some(rules) = &self.strategy.intraday {
            rules.validate()?;
        }
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    ///
    /// Two runs with identical configs share a RunId and an output directory.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_default();
        let hash = blake3::hash(json.as_bytes());
        format!("{}", hash.to_hex())
    }
}
