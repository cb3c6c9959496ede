//! Backtest runner: wires together source, engine, and report.
//!
//! Two entry points:
//! - `run_single_backtest()`: builds the bar source from the config, then runs. Used by CLI.
//! - `run_backtest_from_source()`: takes any `BarSource`. Used by tests and callers
//!   that already hold bars.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use fibcross_core::data::{BarSource, CsvSource, YahooRequest, YahooSource};
use fibcross_core::engine::{Backtester, RunResult};

use crate::config::{BacktestConfig, SourceConfig};
use crate::report::{build_report, BacktestReport};

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub run_id: String,
    pub symbol: String,
    pub run: RunResult,
    /// `None` when the run closed no trades.
    pub report: Option<BacktestReport>,
}

/// Build the configured bar source.
pub fn source_for(config: &BacktestConfig) -> Result<Box<dyn BarSource>> {
    match &config.source {
        SourceConfig::Yahoo { start, end } => {
            let request = YahooRequest {
                symbol: config.symbol.clone(),
                start: *start,
                end: *end,
                interval: config.interval,
            };
            let source = YahooSource::new(request).context("failed to set up Yahoo source")?;
            Ok(Box::new(source))
        }
        SourceConfig::Csv { path } => Ok(Box::new(CsvSource::new(path.clone()))),
    }
}

/// Run a single backtest from a BacktestConfig.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult> {
    config.validate().context("invalid backtest config")?;
    let mut source = source_for(config)?;
    run_backtest_from_source(config, source.as_mut())
}

/// Run a backtest over an already-constructed source.
pub fn run_backtest_from_source(
    config: &BacktestConfig,
    source: &mut dyn BarSource,
) -> Result<BacktestResult> {
    let run_id = config.run_id();
    info!(
        run_id = %run_id,
        symbol = %config.symbol,
        source = source.name(),
        interval = %config.interval,
        "starting backtest"
    );

    let backtester = Backtester::from_source(
        &config.symbol,
        source,
        config.indicators,
        config.strategy,
        config.commission,
    )
    .with_context(|| format!("failed to prepare backtest for {}", config.symbol))?;

    let run = backtester
        .run()
        .with_context(|| format!("backtest for {} aborted", config.symbol))?;
    let report = build_report(&run, config.commission);

    Ok(BacktestResult {
        run_id,
        symbol: config.symbol.clone(),
        run,
        report,
    })
}
