//! FibCross CLI: backtest and live trading commands.
//!
//! Commands:
//! - `backtest`: replay a symbol's bars from Yahoo Finance or a CSV file and
//!   print the report; artifacts land in `<output-dir>/<run-id>/`
//! - `live`: poll Binance klines for each configured symbol and place market
//!   orders on fills

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use fibcross_core::domain::BarInterval;
use fibcross_core::exchange::BinanceClient;
use fibcross_runner::runner::run_single_backtest;
use fibcross_runner::{write_artifacts, BacktestConfig, BacktestResult, LiveTrader, SourceConfig, NO_TRADES_NOTICE};

#[derive(Parser)]
#[command(
    name = "fibcross",
    about = "FibCross CLI, dual-crossover backtesting and live trading"
)]
struct Cli {
    /// Log filter (e.g. info, debug, fibcross_core=trace). FIBCROSS_LOG overrides it.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Write logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest and print the report.
    Backtest {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbol to backtest.
        #[arg(long, alias = "pairset")]
        symbol: Option<String>,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        datestart: Option<String>,

        /// End date (YYYY-MM-DD).
        #[arg(long)]
        dateend: Option<String>,

        /// Bar interval (e.g. 1m, 15m, 1h, 1d).
        #[arg(long)]
        candle: Option<String>,

        /// Read bars from a CSV file instead of Yahoo Finance.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Directory for trades.csv, equity.csv and report.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Trade live on Binance using the `[live]` table of the config.
    Live {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbols to trade; overrides the config list.
        #[arg(long, num_args = 1..)]
        symbols: Vec<String>,

        /// Bar interval; overrides the config.
        #[arg(long)]
        candle: Option<String>,

        /// Stop after this many polls.
        #[arg(long)]
        max_ticks: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Backtest {
            config,
            symbol,
            datestart,
            dateend,
            candle,
            csv,
            output_dir,
        } => {
            let overrides = Overrides {
                symbol,
                datestart,
                dateend,
                candle,
                csv,
            };
            run_backtest_cmd(config.as_deref(), overrides, &output_dir)
        }
        Commands::Live {
            config,
            symbols,
            candle,
            max_ticks,
        } => run_live_cmd(config.as_deref(), symbols, candle, max_ticks),
    }
}

fn init_tracing(log_level: &str, format: LogFormat, log_file: Option<&Path>) -> Result<()> {
    let filter = std::env::var("FIBCROSS_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter =
        tracing_subscriber::EnvFilter::try_new(filter).context("invalid log filter")?;
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    match (format, log_file) {
        (LogFormat::Json, Some(path)) => builder.json().with_writer(Mutex::new(open_log(path)?)).init(),
        (LogFormat::Json, None) => builder.json().with_writer(std::io::stderr).init(),
        (LogFormat::Text, Some(path)) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(open_log(path)?))
            .init(),
        (LogFormat::Text, None) => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn open_log(path: &Path) -> Result<File> {
    File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<BacktestConfig> {
    match path {
        Some(path) => BacktestConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn parse_interval(text: &str) -> Result<BarInterval> {
    text.parse()
        .with_context(|| format!("invalid --candle '{text}'"))
}

/// Command-line values that replace fields of the loaded config.
struct Overrides {
    symbol: Option<String>,
    datestart: Option<String>,
    dateend: Option<String>,
    candle: Option<String>,
    csv: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, config: &mut BacktestConfig) -> Result<()> {
        if let Some(symbol) = self.symbol {
            config.symbol = symbol;
        }
        if let Some(candle) = self.candle {
            config.interval = parse_interval(&candle)?;
        }
        if let Some(path) = self.csv {
            if self.datestart.is_some() || self.dateend.is_some() {
                bail!("--csv cannot be combined with --datestart/--dateend");
            }
            config.source = SourceConfig::Csv { path };
            return Ok(());
        }
        if self.datestart.is_none() && self.dateend.is_none() {
            return Ok(());
        }
        let (mut start, mut end) = match config.source {
            SourceConfig::Yahoo { start, end } => (start, end),
            SourceConfig::Csv { .. } => match SourceConfig::default() {
                SourceConfig::Yahoo { start, end } => (start, end),
                SourceConfig::Csv { .. } => bail!("default source is not Yahoo"),
            },
        };
        if let Some(text) = self.datestart {
            start = parse_date(&text, "--datestart")?;
        }
        if let Some(text) = self.dateend {
            end = parse_date(&text, "--dateend")?;
        }
        config.source = SourceConfig::Yahoo { start, end };
        Ok(())
    }
}

fn parse_date(text: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("invalid {flag} '{text}' (expected YYYY-MM-DD)"))
}

fn run_backtest_cmd(config_path: Option<&Path>, overrides: Overrides, output_dir: &Path) -> Result<()> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config)?;

    let result = run_single_backtest(&config)?;
    print_summary(&config, &result);

    let run_dir = output_dir.join(&result.run_id);
    write_artifacts(
        &run_dir,
        &config,
        result.run.stats,
        &result.run.trades,
        result.report.as_ref(),
    )?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn print_summary(config: &BacktestConfig, result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    match &config.source {
        SourceConfig::Yahoo { start, end } => println!("Period:         {start} to {end}"),
        SourceConfig::Csv { path } => println!("Source:         {}", path.display()),
    }
    println!("Interval:       {}", config.interval);
    println!("Bars:           {}", result.run.stats.advances);
    println!("Signals:        {}", result.run.stats.signals);
    if let Some(open) = &result.run.open_position {
        println!(
            "Open position:  {:?} since {} at {:.4}",
            open.side, open.entry_date, open.entry_price
        );
    }
    println!();
    match &result.report {
        Some(report) => print!("{report}"),
        None => println!("{NO_TRADES_NOTICE}"),
    }
    println!();
}

fn run_live_cmd(
    config_path: Option<&Path>,
    symbols: Vec<String>,
    candle: Option<String>,
    max_ticks: Option<u64>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if !symbols.is_empty() {
        config.live.symbols = symbols;
    }
    if let Some(candle) = candle {
        config.live.interval = parse_interval(&candle)?;
    }
    config.validate().context("invalid config")?;

    let client = BinanceClient::from_env().context("failed to set up Binance client")?;
    let mut trader = LiveTrader::new(
        client,
        &config.live,
        config.indicators,
        config.strategy,
        config.commission,
    )?;
    info!(run_id = %config.run_id(), "live session");
    trader.run(max_ticks)
}
