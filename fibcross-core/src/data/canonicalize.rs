//! Canonical bar order: ascending timestamps, one bar per timestamp.

use crate::domain::RawBar;

/// Outcome of a canonicalization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanonicalStats {
    pub input: usize,
    pub duplicates: usize,
    pub reordered: bool,
}

/// Stable sort by timestamp, then drop later duplicates (keep first).
pub fn canonicalize(mut bars: Vec<RawBar>) -> (Vec<RawBar>, CanonicalStats) {
    let input = bars.len();
    let reordered = bars.windows(2).any(|w| w[0].timestamp > w[1].timestamp);
    if reordered {
        bars.sort_by_key(|b| b.timestamp);
    }
    bars.dedup_by_key(|b| b.timestamp);
    let stats = CanonicalStats {
        input,
        duplicates: input - bars.len(),
        reordered,
    };
    (bars, stats)
}

/// True if timestamps are strictly increasing.
pub fn is_canonical(bars: &[RawBar]) -> bool {
    bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}
