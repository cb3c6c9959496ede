//! Indicator parameter groups.
//!
//! An immutable configuration value handed to the pipeline constructor.
//! Method codes follow the historical convention: 1 = Wilder recursion,
//! 2 = exponential recursion, anything else = trailing simple average.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which smoothing the operator applies after the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum SmoothingMethod {
    /// `prev * (1 - 1/n) + x / n` (code 1).
    Wilder,
    /// `a * x + prev * (1 - a)`, `a = 2/(n+1)` (code 2).
    Exponential,
    /// Plain trailing mean, no offset dependency (any other code).
    Simple(u8),
}

impl SmoothingMethod {
    pub fn code(&self) -> u8 {
        match self {
            SmoothingMethod::Wilder => 1,
            SmoothingMethod::Exponential => 2,
            SmoothingMethod::Simple(code) => *code,
        }
    }

    /// True for the offset-seeded recursive methods.
    pub fn is_recursive(&self) -> bool {
        matches!(self, SmoothingMethod::Wilder | SmoothingMethod::Exponential)
    }
}

impl From<u8> for SmoothingMethod {
    fn from(code: u8) -> Self {
        match code {
            1 => SmoothingMethod::Wilder,
            2 => SmoothingMethod::Exponential,
            other => SmoothingMethod::Simple(other),
        }
    }
}

impl From<SmoothingMethod> for u8 {
    fn from(method: SmoothingMethod) -> Self {
        method.code()
    }
}

/// `{lookback, smooth, method}` group used by fib, fast and high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageParams {
    pub lookback: usize,
    pub smooth: usize,
    pub method: SmoothingMethod,
}

/// Two-stage group used by slow: `fast_pred → fast_ma → slow_pred`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowParams {
    pub lookback1: usize,
    pub method1: SmoothingMethod,
    pub lookback2: usize,
    pub method2: SmoothingMethod,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("{group}.{field} must be >= 1")]
    ZeroLength {
        group: &'static str,
        field: &'static str,
    },
}

/// The four parameter groups of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub fib: StageParams,
    pub fast: StageParams,
    pub slow: SlowParams,
    pub high: StageParams,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            fib: StageParams {
                lookback: 33,
                smooth: 2,
                method: SmoothingMethod::Simple(3),
            },
            fast: StageParams {
                lookback: 12,
                smooth: 12,
                method: SmoothingMethod::Exponential,
            },
            slow: SlowParams {
                lookback1: 3,
                method1: SmoothingMethod::Exponential,
                lookback2: 14,
                method2: SmoothingMethod::Exponential,
            },
            high: StageParams {
                lookback: 9,
                smooth: 13,
                method: SmoothingMethod::Wilder,
            },
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        let checks = [
            ("fib", "lookback", self.fib.lookback),
            ("fib", "smooth", self.fib.smooth),
            ("fast", "lookback", self.fast.lookback),
            ("fast", "smooth", self.fast.smooth),
            ("slow", "lookback1", self.slow.lookback1),
            ("slow", "lookback2", self.slow.lookback2),
            ("high", "lookback", self.high.lookback),
            ("high", "smooth", self.high.smooth),
        ];
        for (group, field, value) in checks {
            if value == 0 {
                return Err(ParamsError::ZeroLength { group, field });
            }
        }
        Ok(())
    }
}
