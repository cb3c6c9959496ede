//! Open positions and closed round-trip trades.

use super::event::SignalKind;
use super::ids::TradeId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }

    pub fn from_entry(kind: SignalKind) -> Option<Self> {
        match kind {
            SignalKind::Long => Some(PositionSide::Long),
            SignalKind::Short => Some(PositionSide::Short),
            SignalKind::Exit(_) => None,
        }
    }
}

/// A position between its entry fill and its exit fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: TradeId,
    pub side: PositionSide,
    pub entry_date: NaiveDateTime,
    /// Commission-adjusted entry price.
    pub entry_price: f64,
}

/// A complete round-trip trade record: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub id: TradeId,
    pub side: PositionSide,

    // ── Entry ──
    pub entry_date: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_date: NaiveDateTime,
    pub exit_price: f64,
    pub exit_type: SignalKind,

    /// `(exit_price / entry_price - 1) * 100`, for both sides.
    pub pnl_pct: f64,
}

impl ClosedTrade {
    pub fn close(position: Position, exit_date: NaiveDateTime, exit_price: f64, exit_type: SignalKind) -> Self {
        let pnl_pct = (exit_price / position.entry_price - 1.0) * 100.0;
        Self {
            id: position.id,
            side: position.side,
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_date,
            exit_price,
            exit_type,
            pnl_pct,
        }
    }

    /// Price move in the position's favour, in percent.
    ///
    /// The ledger and report keep `pnl_pct`; this is for callers that want
    /// short trades scored by direction.
    pub fn directional_pnl_pct(&self) -> f64 {
        self.pnl_pct * self.side.sign()
    }

    pub fn is_winner(&self) -> bool {
        self.pnl_pct > 0.0
    }
}
