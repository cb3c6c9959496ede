//! Backtest report: pure functions over the ledger output.
//!
//! Closed trades and the per-tick return series in, summary table and
//! cumulative-return curve out. No I/O here; see `export` for artifacts.

use chrono::NaiveDateTime;
use fibcross_core::domain::ClosedTrade;
use fibcross_core::engine::RunResult;
use fibcross_core::portfolio::ReturnPoint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Printed instead of a report when the run closed no trades.
pub const NO_TRADES_NOTICE: &str = "There isn't any trade, try a different set of parameters.";

/// One point of the cumulative-return curve `Π(1 + r)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub cumulative: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub number_of_trades: usize,
    pub total_return_pct: f64,
    /// `None` when no bars were replayed.
    pub market_return_pct: Option<f64>,
    pub positive_trades: usize,
    pub winrate_pct: f64,
    /// Mean `pnl_pct` of winners; NaN when there are none.
    pub avg_win: f64,
    /// Mean `pnl_pct` of losers; NaN when there are none.
    pub avg_loss: f64,
    pub cumulative: Vec<EquityPoint>,
}

/// Build the report for a finished run. `None` means zero closed trades.
pub fn build_report(result: &RunResult, commission: f64) -> Option<BacktestReport> {
    let mut report = summarize(&result.trades, &result.returns, commission)?;
    report.market_return_pct = result.market_return().map(|r| r * 100.0);
    Some(report)
}

/// Report from trades and returns alone. Market return is left unset.
pub fn summarize(
    trades: &[ClosedTrade],
    returns: &[ReturnPoint],
    commission: f64,
) -> Option<BacktestReport> {
    if trades.is_empty() {
        return None;
    }
    let cumulative = cumulative_returns(returns);
    let growth = cumulative.last().map_or(1.0, |p| p.cumulative);
    let n = trades.len();

    let wins: Vec<f64> = trades.iter().filter(|t| t.pnl_pct > 0.0).map(|t| t.pnl_pct).collect();
    let losses: Vec<f64> = trades.iter().filter(|t| t.pnl_pct < 0.0).map(|t| t.pnl_pct).collect();

    Some(BacktestReport {
        number_of_trades: n,
        total_return_pct: total_return_pct(growth, n, commission),
        market_return_pct: None,
        positive_trades: wins.len(),
        winrate_pct: wins.len() as f64 / n as f64 * 100.0,
        avg_win: mean(&wins),
        avg_loss: mean(&losses),
        cumulative,
    })
}

// ─── Individual metric functions ────────────────────────────────────

/// Running product of `1 + r`, one point per return.
pub fn cumulative_returns(returns: &[ReturnPoint]) -> Vec<EquityPoint> {
    let mut acc = 1.0;
    returns
        .iter()
        .map(|r| {
            acc *= 1.0 + r.value;
            EquityPoint {
                timestamp: r.timestamp,
                cumulative: acc,
            }
        })
        .collect()
}

/// `(growth - 1) * 100` less one commission charge per trade.
pub fn total_return_pct(growth: f64, trades: usize, commission: f64) -> f64 {
    (growth - 1.0) * 100.0 - trades as f64 * commission * 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn fmt_value(f: &mut fmt::Formatter<'_>, label: &str, value: f64) -> fmt::Result {
    writeln!(f, "{label:<20}{value:>14.4}")
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<20}{:>14}", "", "Values")?;
        writeln!(f, "{:<20}{:>14}", "Number of Trades", self.number_of_trades)?;
        fmt_value(f, "Total Return (%)", self.total_return_pct)?;
        if let Some(market) = self.market_return_pct {
            fmt_value(f, "Market Return (%)", market)?;
        }
        writeln!(f, "{:<20}{:>14}", "Positive Trades", self.positive_trades)?;
        fmt_value(f, "Winrate (%)", self.winrate_pct)?;
        fmt_value(f, "Avg. Win", self.avg_win)?;
        fmt_value(f, "Avg. Loss", self.avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn returns(values: &[f64]) -> Vec<ReturnPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| ReturnPoint {
                timestamp: at(i as u32 + 1),
                value,
            })
            .collect()
    }

    #[test]
    fn cumulative_compounds() {
        let curve = cumulative_returns(&returns(&[0.1, 0.0, -0.5]));
        assert_eq!(curve.len(), 3);
        assert!((curve[0].cumulative - 1.1).abs() < 1e-12);
        assert!((curve[2].cumulative - 0.55).abs() < 1e-12);
        assert_eq!(curve[2].timestamp, at(3));
    }

    #[test]
    fn total_return_subtracts_commission_per_trade() {
        assert!((total_return_pct(1.1, 2, 0.002) - 9.6).abs() < 1e-9);
        assert!((total_return_pct(1.0, 0, 0.002)).abs() < 1e-12);
    }

    #[test]
    fn mean_of_empty_is_nan() {
        assert!(mean(&[]).is_nan());
        assert_eq!(mean(&[1.0, 3.0]), 2.0);
    }

    #[test]
    fn zero_trades_gives_none() {
        assert!(summarize(&[], &returns(&[0.0, 0.0]), 0.002).is_none());
    }
}
