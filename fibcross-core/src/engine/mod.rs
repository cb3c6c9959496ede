//! Backtesting engine: event bus and the bar-by-bar replay driver.

pub mod driver;
pub mod error;
pub mod event_bus;

pub use driver::{Backtester, RunResult, RunStats};
pub use error::EngineError;
pub use event_bus::EventBus;
