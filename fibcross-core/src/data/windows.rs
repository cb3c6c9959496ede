//! Vendor fetch windows.
//!
//! Sub-daily history is served in windows of at most seven calendar days.
//! Windows are inclusive, contiguous, and never extend past the end date.

use chrono::{Duration, NaiveDate};

pub const MAX_INTRADAY_WINDOW_DAYS: i64 = 7;

/// Inclusive `[start, end]` date pairs covering the range.
///
/// `intraday == false` returns the whole range as one window.
pub fn fetch_windows(start: NaiveDate, end: NaiveDate, intraday: bool) -> Vec<(NaiveDate, NaiveDate)> {
    if start > end {
        return Vec::new();
    }
    if !intraday {
        return vec![(start, end)];
    }
    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let window_end = (cursor + Duration::days(MAX_INTRADAY_WINDOW_DAYS - 1)).min(end);
        windows.push((cursor, window_end));
        cursor = window_end + Duration::days(1);
    }
    windows
}
