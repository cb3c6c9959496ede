//! Bar interval ("1m", "4h", "1d", ...) parsing and vendor codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl IntervalUnit {
    fn seconds(&self) -> u64 {
        match self {
            IntervalUnit::Second => 1,
            IntervalUnit::Minute => 60,
            IntervalUnit::Hour => 3_600,
            IntervalUnit::Day => 86_400,
            IntervalUnit::Week => 604_800,
            // Calendar months vary; 30 days is only used for trailing-window sizing.
            IntervalUnit::Month => 2_592_000,
        }
    }

    fn suffix(&self) -> char {
        match self {
            IntervalUnit::Second => 's',
            IntervalUnit::Minute => 'm',
            IntervalUnit::Hour => 'h',
            IntervalUnit::Day => 'd',
            IntervalUnit::Week => 'w',
            IntervalUnit::Month => 'M',
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("empty bar interval")]
    Empty,
    #[error("invalid bar interval '{0}' (expected e.g. 1m, 15m, 1h, 1d, 1w, 1M)")]
    Invalid(String),
}

/// A fixed bar width such as `15m` or `1d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BarInterval {
    pub amount: u32,
    pub unit: IntervalUnit,
}

impl BarInterval {
    pub const fn new(amount: u32, unit: IntervalUnit) -> Self {
        Self { amount, unit }
    }

    pub const ONE_DAY: BarInterval = BarInterval::new(1, IntervalUnit::Day);

    pub fn as_seconds(&self) -> u64 {
        self.amount as u64 * self.unit.seconds()
    }

    /// Sub-daily intervals are fetched from the vendor in bounded windows.
    pub fn is_intraday(&self) -> bool {
        self.as_seconds() < IntervalUnit::Day.seconds()
    }

    /// Interval code understood by the Yahoo chart API.
    pub fn yahoo_code(&self) -> String {
        match self.unit {
            IntervalUnit::Week => format!("{}wk", self.amount),
            IntervalUnit::Month => format!("{}mo", self.amount),
            _ => self.to_string(),
        }
    }

    /// Interval code understood by the Binance kline API.
    pub fn binance_code(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

impl FromStr for BarInterval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let suffix = s.chars().last().ok_or(IntervalError::Empty)?;
        let unit = match suffix {
            's' => IntervalUnit::Second,
            'm' => IntervalUnit::Minute,
            'h' | 'H' => IntervalUnit::Hour,
            'd' | 'D' => IntervalUnit::Day,
            'w' | 'W' => IntervalUnit::Week,
            'M' => IntervalUnit::Month,
            _ => return Err(IntervalError::Invalid(s.to_string())),
        };
        let amount: u32 = s[..s.len() - suffix.len_utf8()]
            .parse()
            .map_err(|_| IntervalError::Invalid(s.to_string()))?;
        if amount == 0 {
            return Err(IntervalError::Invalid(s.to_string()));
        }
        Ok(Self { amount, unit })
    }
}

impl TryFrom<String> for BarInterval {
    type Error = IntervalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BarInterval> for String {
    fn from(value: BarInterval) -> Self {
        value.to_string()
    }
}
