//! Signal state machine.
//!
//! A strategy sees the most recent bars once per Market event and emits at
//! most one signal. Its own position flag is the only re-entry guard; the
//! ledger never vetoes.

pub mod crossover;
pub mod intraday;
pub mod machine;

use crate::domain::{Bar, PositionSide, SignalInfo};
use serde::{Deserialize, Serialize};

pub use crossover::{detect, Crossover};
pub use intraday::{IntradayError, IntradayRules, IntradayState};
pub use machine::{CrossoverStrategy, StrategySettings};

/// The strategy's view of its own exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
    Short,
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn side(&self) -> Option<PositionSide> {
        match self {
            PositionState::Flat => None,
            PositionState::Long => Some(PositionSide::Long),
            PositionState::Short => Some(PositionSide::Short),
        }
    }
}

pub trait Strategy {
    fn name(&self) -> &str;

    /// Number of bars the strategy reads per evaluation.
    fn lookback(&self) -> usize {
        2
    }

    /// Evaluate once per Market event. `window` holds the latest bars,
    /// oldest first, and may be shorter than `lookback()`.
    fn on_market(&mut self, window: &[Bar]) -> Option<SignalInfo>;

    fn position(&self) -> PositionState;
}
