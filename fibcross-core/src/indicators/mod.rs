//! Indicator pipeline.
//!
//! Raw OHLCV goes in once; seven aligned series come out. Nothing here is
//! recomputed incrementally during replay.

pub mod oscillator;
pub mod params;
pub mod pipeline;
pub mod smooth;

pub use params::{IndicatorParams, ParamsError, SlowParams, SmoothingMethod, StageParams};
pub use pipeline::{IndicatorColumns, IndicatorPipeline, StageLayout};

/// Create synthetic raw bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
/// Bars are one day apart starting 2024-01-02.
#[cfg(test)]
pub fn make_raw_bars(closes: &[f64]) -> Vec<crate::domain::RawBar> {
    use crate::domain::RawBar;
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            RawBar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
