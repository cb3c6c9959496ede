//! FibCross Runner: configuration, backtest orchestration, reports, live trading.
//!
//! This crate builds on `fibcross-core` to provide:
//! - TOML run configuration with content-addressed run ids
//! - Single-backtest runner over Yahoo, CSV, or in-memory bars
//! - Summary report and cumulative-return curve
//! - Artifact export (trades.csv, equity.csv, report.json)
//! - Multi-symbol live trading loop over an exchange client

pub mod config;
pub mod export;
pub mod live;
pub mod report;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, LiveConfig, RunId, SourceConfig};
pub use export::write_artifacts;
pub use live::LiveTrader;
pub use report::{build_report, summarize, BacktestReport, EquityPoint, NO_TRADES_NOTICE};
pub use runner::{run_backtest_from_source, run_single_backtest, source_for, BacktestResult};
