//! The chained indicator pipeline.
//!
//! Stage order is fixed: oscillators, then `fib_pred` and `fast_pred`, then
//! the two slow stages, then `high_pred`. Each smoothing stage is offset by
//! the cumulative upstream lookbacks so its recursion starts on stable input.

use super::oscillator::close_range;
use super::params::{IndicatorParams, ParamsError};
use super::smooth::smooth;
use crate::domain::{Bar, IndicatorSet, RawBar};

/// The seven derived series, column-wise.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorColumns {
    pub c_r_fib: Vec<f64>,
    pub c_r_fast: Vec<f64>,
    pub fib_pred: Vec<f64>,
    pub fast_pred: Vec<f64>,
    pub fast_ma: Vec<f64>,
    pub slow_pred: Vec<f64>,
    pub high_pred: Vec<f64>,
}

impl IndicatorColumns {
    pub fn len(&self) -> usize {
        self.c_r_fib.len()
    }

    pub fn is_empty(&self) -> bool {
        self.c_r_fib.is_empty()
    }

    /// Row `i` as an `IndicatorSet`.
    pub fn row(&self, i: usize) -> IndicatorSet {
        IndicatorSet {
            c_r_fib: self.c_r_fib[i],
            c_r_fast: self.c_r_fast[i],
            fib_pred: self.fib_pred[i],
            fast_pred: self.fast_pred[i],
            fast_ma: self.fast_ma[i],
            slow_pred: self.slow_pred[i],
            high_pred: self.high_pred[i],
        }
    }
}

/// Smoothing offsets and first-defined indices per stage.
///
/// First indices assume finite oscillator input; a flat high/low range can
/// push a stage's first defined value later, never earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLayout {
    pub fib_offset: usize,
    pub fast_offset: usize,
    pub fast_ma_offset: usize,
    pub slow_offset: usize,
    pub high_offset: usize,

    pub c_r_fib_first: usize,
    pub c_r_fast_first: usize,
    pub fib_first: usize,
    pub fast_first: usize,
    pub fast_ma_first: usize,
    pub slow_first: usize,
    pub high_first: usize,
}

impl StageLayout {
    /// Requires validated params (all lengths >= 1).
    pub fn new(params: &IndicatorParams) -> Self {
        let fib = params.fib;
        let fast = params.fast;
        let slow = params.slow;
        let high = params.high;

        let fib_offset = fib.lookback;
        let fast_offset = fast.lookback;
        let fast_ma_offset = fast.lookback + fast.smooth - 1;
        let slow_offset = fast.lookback + fast.smooth + slow.lookback1 - 2;
        let high_offset =
            fast.lookback + fast.smooth + slow.lookback1 + slow.lookback2 + high.lookback - 4;

        let c_r_fib_first = fib.lookback - 1;
        let c_r_fast_first = fast.lookback - 1;

        let fib_first = first_defined(c_r_fib_first, fib_offset, fib.smooth, fib.method.is_recursive());
        let fast_first =
            first_defined(c_r_fast_first, fast_offset, fast.smooth, fast.method.is_recursive());
        let fast_ma_first = first_defined(
            fast_first,
            fast_ma_offset,
            slow.lookback1,
            slow.method1.is_recursive(),
        );
        let slow_first = first_defined(
            fast_ma_first,
            slow_offset,
            slow.lookback2,
            slow.method2.is_recursive(),
        );
        let high_first =
            first_defined(slow_first, high_offset, high.smooth, high.method.is_recursive());

        Self {
            fib_offset,
            fast_offset,
            fast_ma_offset,
            slow_offset,
            high_offset,
            c_r_fib_first,
            c_r_fast_first,
            fib_first,
            fast_first,
            fast_ma_first,
            slow_first,
            high_first,
        }
    }

    /// Leading bars where any of `fib_pred`, `fast_pred`, `high_pred` is undefined.
    pub fn warm_up(&self) -> usize {
        self.fib_first.max(self.fast_first).max(self.high_first)
    }
}

/// First defined output index of one smoothing stage.
///
/// A recursive stage seeds at `offset + length - 2`, but only if its seed
/// window reaches a defined input; otherwise it never becomes defined, which
/// is reported as `usize::MAX`. A simple stage needs `length` defined inputs.
fn first_defined(input_first: usize, offset: usize, length: usize, recursive: bool) -> usize {
    if input_first == usize::MAX {
        return usize::MAX;
    }
    if recursive {
        let seed = offset + length - 2;
        if seed >= input_first {
            seed
        } else {
            usize::MAX
        }
    } else {
        input_first + length - 1
    }
}

/// The pipeline itself: an immutable parameter value plus its layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPipeline {
    params: IndicatorParams,
    layout: StageLayout,
}

impl IndicatorPipeline {
    pub fn new(params: IndicatorParams) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self {
            params,
            layout: StageLayout::new(&params),
        })
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    pub fn layout(&self) -> &StageLayout {
        &self.layout
    }

    pub fn warm_up(&self) -> usize {
        self.layout.warm_up()
    }

    /// Compute every derived column over the whole series.
    pub fn compute_columns(&self, bars: &[RawBar]) -> IndicatorColumns {
        let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let close: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let p = &self.params;
        let l = &self.layout;

        let c_r_fib = close_range(&high, &low, &close, p.fib.lookback);
        let c_r_fast = close_range(&high, &low, &close, p.fast.lookback);

        let fib_pred = smooth(&c_r_fib, l.fib_offset, p.fib.smooth, p.fib.method);
        let fast_pred = smooth(&c_r_fast, l.fast_offset, p.fast.smooth, p.fast.method);
        let fast_ma = smooth(&fast_pred, l.fast_ma_offset, p.slow.lookback1, p.slow.method1);
        let slow_pred = smooth(&fast_ma, l.slow_offset, p.slow.lookback2, p.slow.method2);
        let high_pred = smooth(&slow_pred, l.high_offset, p.high.smooth, p.high.method);

        IndicatorColumns {
            c_r_fib,
            c_r_fast,
            fib_pred,
            fast_pred,
            fast_ma,
            slow_pred,
            high_pred,
        }
    }

    /// Attach indicators to every bar. Output length equals input length.
    pub fn apply(&self, bars: &[RawBar]) -> Vec<Bar> {
        let columns = self.compute_columns(bars);
        debug_assert_eq!(columns.len(), bars.len());
        bars.iter()
            .enumerate()
            .map(|(i, raw)| raw.with_indicators(columns.row(i)))
            .collect()
    }
}
