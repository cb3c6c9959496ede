//! FibCross Core: bars, indicator pipeline, feeds, event bus, strategy, ledger.
//!
//! This crate contains the heart of the backtest kernel:
//! - Domain types (raw and enriched bars, events, positions, closed trades)
//! - Indicator pipeline (range oscillator, smoothing stages, warm-up layout)
//! - Bar sources (Yahoo Finance, CSV, in-memory) and replay/live feeds
//! - Single-threaded FIFO event bus and the backtest driver
//! - Crossover strategy state machine with optional intraday rules
//! - Trade ledger with commission-adjusted fills and per-tick returns
//! - Binance REST client for klines and signed market orders

pub mod data;
pub mod domain;
pub mod engine;
pub mod exchange;
pub mod indicators;
pub mod portfolio;
pub mod strategy;
