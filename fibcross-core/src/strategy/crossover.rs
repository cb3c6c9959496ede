//! Dual crossover detection: fib over fast and fib over high in one tick.
//!
//! Bullish when `fib_pred` moves from strictly below both `fast_pred` and
//! `high_pred` on the prior bar to strictly above both on the current bar.
//! Bearish is the mirror. Any NaN among the six values means no crossover.

use crate::domain::IndicatorSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    Bullish,
    Bearish,
}

pub fn detect(prev: &IndicatorSet, curr: &IndicatorSet) -> Option<Crossover> {
    if !(prev.signals_defined() && curr.signals_defined()) {
        return None;
    }

    let (fib, fast, high) = (curr.fib_pred, curr.fast_pred, curr.high_pred);
    let (fib_1, fast_1, high_1) = (prev.fib_pred, prev.fast_pred, prev.high_pred);

    if fib > fast && fib_1 < fast_1 && fib > high && fib_1 < high_1 {
        return Some(Crossover::Bullish);
    }
    if fib < fast && fib_1 > fast_1 && fib < high && fib_1 > high_1 {
        return Some(Crossover::Bearish);
    }
    None
}
