//! Artifact export: trade tape, cumulative-return curve, and the JSON report.
//!
//! Writes three files into one run directory:
//! - `trades.csv`: one row per closed trade
//! - `equity.csv`: the `Π(1 + r)` series
//! - `report.json`: config, run id, stats, and the summary table (or the
//!   zero-trade notice)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fibcross_core::domain::ClosedTrade;
use fibcross_core::engine::RunStats;
use serde::Serialize;

use crate::config::BacktestConfig;
use crate::report::{BacktestReport, EquityPoint, NO_TRADES_NOTICE};

pub const TRADES_FILE: &str = "trades.csv";
pub const EQUITY_FILE: &str = "equity.csv";
pub const REPORT_FILE: &str = "report.json";

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct ReportArtifact<'a> {
    schema_version: u32,
    run_id: String,
    config: &'a BacktestConfig,
    stats: RunStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ReportSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<&'static str>,
}

/// The report without its curve, which lives in `equity.csv`.
#[derive(Debug, Serialize)]
struct ReportSummary {
    number_of_trades: usize,
    total_return_pct: f64,
    market_return_pct: Option<f64>,
    positive_trades: usize,
    winrate_pct: f64,
    /// Serialized as null when NaN.
    avg_win: Option<f64>,
    avg_loss: Option<f64>,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade tape as CSV text.
///
/// Columns: id, side, entry_date, entry_price, exit_date, exit_price,
/// exit_type, pnl_pct
pub fn trades_csv(trades: &[ClosedTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "id",
        "side",
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "exit_type",
        "pnl_pct",
    ])?;
    for t in trades {
        wtr.write_record([
            &t.id.to_string(),
            &format!("{:?}", t.side),
            &t.entry_date.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_date.to_string(),
            &format!("{:.6}", t.exit_price),
            &t.exit_type.to_string(),
            &format!("{:.6}", t.pnl_pct),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush trades CSV")?;
    String::from_utf8(bytes).context("trades CSV is not UTF-8")
}

/// Cumulative-return curve as CSV text.
pub fn equity_csv(curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "cumulative_return"])?;
    for p in curve {
        wtr.write_record([&p.timestamp.to_string(), &format!("{:.8}", p.cumulative)])?;
    }
    let bytes = wtr.into_inner().context("failed to flush equity CSV")?;
    String::from_utf8(bytes).context("equity CSV is not UTF-8")
}

/// `report.json` text.
pub fn report_json(
    config: &BacktestConfig,
    stats: RunStats,
    report: Option<&BacktestReport>,
) -> Result<String> {
    let artifact = ReportArtifact {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        config,
        stats,
        report: report.map(|r| ReportSummary {
            number_of_trades: r.number_of_trades,
            total_return_pct: r.total_return_pct,
            market_return_pct: r.market_return_pct,
            positive_trades: r.positive_trades,
            winrate_pct: r.winrate_pct,
            avg_win: finite(r.avg_win),
            avg_loss: finite(r.avg_loss),
        }),
        notice: report.is_none().then_some(NO_TRADES_NOTICE),
    };
    serde_json::to_string_pretty(&artifact).context("failed to serialize report to JSON")
}

// ─── Directory export ───────────────────────────────────────────────

/// Write all three artifacts under `dir`, creating it if needed.
///
/// Returns the paths written.
pub fn write_artifacts(
    dir: &Path,
    config: &BacktestConfig,
    stats: RunStats,
    trades: &[ClosedTrade],
    report: Option<&BacktestReport>,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let curve = report.map(|r| r.cumulative.as_slice()).unwrap_or_default();
    let files = [
        (TRADES_FILE, trades_csv(trades)?),
        (EQUITY_FILE, equity_csv(curve)?),
        (REPORT_FILE, report_json(config, stats, report)?),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = dir.join(name);
        fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
