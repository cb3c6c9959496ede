//! The offset-seeded smoothing operator.
//!
//! `smooth(values, offset, length, method)`:
//! - indices before `offset + length - 2` are NaN;
//! - index `offset + length - 2` is the NaN-ignoring mean of the `length`
//!   values ending there;
//! - later indices recurse on the current raw value and the previous
//!   smoothed value (exponential `2/(n+1)` or Wilder `1/n`).
//!
//! The `Simple` method ignores the offset and returns a trailing mean.

use super::params::SmoothingMethod;

/// Index of the seed value, or `None` if `offset + length < 2`.
pub fn seed_index(offset: usize, length: usize) -> Option<usize> {
    (offset + length).checked_sub(2)
}

/// Apply the smoothing operator.
pub fn smooth(values: &[f64], offset: usize, length: usize, method: SmoothingMethod) -> Vec<f64> {
    match method {
        SmoothingMethod::Wilder | SmoothingMethod::Exponential => {
            recursive(values, offset, length, method)
        }
        SmoothingMethod::Simple(_) => rolling_mean(values, length),
    }
}

fn recursive(values: &[f64], offset: usize, length: usize, method: SmoothingMethod) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if length == 0 {
        return result;
    }
    let seed = match seed_index(offset, length) {
        Some(i) if i < n => i,
        _ => return result,
    };

    let start = (seed + 1).saturating_sub(length);
    result[seed] = nan_mean(&values[start..=seed]);

    let len = length as f64;
    for i in (seed + 1)..n {
        let x = values[i];
        let prev = result[i - 1];
        result[i] = match method {
            SmoothingMethod::Exponential => 2.0 / (len + 1.0) * x + prev * (1.0 - 2.0 / (len + 1.0)),
            _ => prev * (1.0 - 1.0 / len) + x / len,
        };
    }
    result
}

/// Mean of the non-NaN values; NaN if there are none.
fn nan_mean(window: &[f64]) -> f64 {
    let (sum, count) = window
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Trailing simple moving average. A window holding a NaN yields NaN.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
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
        result[i] = window.iter().sum::<f64>() / period as f64;
    }
    result
}
