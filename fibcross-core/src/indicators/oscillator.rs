//! Close-in-range oscillator.
//!
//! `100 * (close - min(low, L)) / (max(high, L) - min(low, L))`
//! First valid value at index L-1. A window holding a NaN yields NaN.

/// Rolling minimum over a trailing window of `period` values.
pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling_extreme(values, period, f64::min)
}

/// Rolling maximum over a trailing window of `period` values.
pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling_extreme(values, period, f64::max)
}

fn rolling_extreme(values: &[f64], period: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().copied().fold(window[0], pick);
    }
    result
}

/// Position of the close inside the trailing high/low range, in percent.
///
/// A flat range divides by zero and follows IEEE semantics (NaN or ±inf).
pub fn close_range(high: &[f64], low: &[f64], close: &[f64], lookback: usize) -> Vec<f64> {
    let lowest = rolling_min(low, lookback);
    let highest = rolling_max(high, lookback);
    close
        .iter()
        .zip(lowest.iter().zip(highest.iter()))
        .map(|(&c, (&lo, &hi))| 100.0 * (c - lo) / (hi - lo))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn rolling_min_max_basic() {
        let values = [5.0, 3.0, 4.0, 1.0, 2.0];
        let mins = rolling_min(&values, 3);
        let maxs = rolling_max(&values, 3);
        assert!(mins[0].is_nan() && mins[1].is_nan());
        assert_eq!(mins[2], 3.0);
        assert_eq!(mins[3], 1.0);
        assert_eq!(mins[4], 1.0);
        assert_eq!(maxs[2], 5.0);
        assert_eq!(maxs[3], 4.0);
        assert_eq!(maxs[4], 4.0);
    }

    #[test]
    fn rolling_window_with_nan_is_undefined() {
        let values = [1.0, f64::NAN, 3.0, 4.0, 5.0];
        let mins = rolling_min(&values, 2);
        assert!(mins[1].is_nan());
        assert!(mins[2].is_nan());
        assert_eq!(mins[3], 3.0);
    }

    #[test]
    fn close_range_known_values() {
        // window 3 at index 2: low min 9, high max 13, close 12 → 75%
        let high = [11.0, 12.0, 13.0];
        let low = [9.0, 10.0, 11.0];
        let close = [10.0, 11.0, 12.0];
        let result = close_range(&high, &low, &close, 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 75.0, DEFAULT_EPSILON);
    }

    #[test]
    fn close_range_output_length_matches_input() {
        let n = 10;
        let high = vec![2.0; n];
        let low = vec![1.0; n];
        let close = vec![1.5; n];
        let result = close_range(&high, &low, &close, 20);
        assert_eq!(result.len(), n);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn flat_range_is_not_finite() {
        let flat = [5.0, 5.0, 5.0];
        let result = close_range(&flat, &flat, &flat, 2);
        assert!(!result[1].is_finite());
    }
}
