//! Bar: the fundamental market data unit, with its derived indicator columns.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The seven derived series the indicator pipeline attaches to every bar.
///
/// Values are `f64::NAN` while a stage is still warming up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub c_r_fib: f64,
    pub c_r_fast: f64,
    pub fib_pred: f64,
    pub fast_pred: f64,
    pub fast_ma: f64,
    pub slow_pred: f64,
    pub high_pred: f64,
}

impl IndicatorSet {
    /// Every column undefined.
    pub fn undefined() -> Self {
        Self {
            c_r_fib: f64::NAN,
            c_r_fast: f64::NAN,
            fib_pred: f64::NAN,
            fast_pred: f64::NAN,
            fast_ma: f64::NAN,
            slow_pred: f64::NAN,
            high_pred: f64::NAN,
        }
    }

    /// True when the three series the crossover rule reads are all defined.
    pub fn signals_defined(&self) -> bool {
        !(self.fib_pred.is_nan() || self.fast_pred.is_nan() || self.high_pred.is_nan())
    }
}

impl Default for IndicatorSet {
    fn default() -> Self {
        Self::undefined()
    }
}

/// OHLCV row as a source produces it, before the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl RawBar {
    pub fn with_indicators(self, indicators: IndicatorSet) -> Bar {
        Bar {
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            indicators,
        }
    }
}

/// OHLCV bar for a single symbol and interval, augmented with indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub indicators: IndicatorSet,
}

impl Bar {
    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
    }
}
