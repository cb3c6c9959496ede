//! Trade ledger: Signal → Order → Fill and the closed-trade record.
//!
//! The Order stage is a pass-through with no risk checks. Fills open and
//! close the single position slot. Every Market tick appends one return
//! point, independent of the trade PnL.

use crate::domain::{
    Bar, ClosedTrade, FillInfo, OrderTicket, Position, PositionSide, SignalInfo, TradeId,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("entry fill at {at} while trade {open} is still open")]
    AlreadyOpen { open: TradeId, at: NaiveDateTime },

    #[error("exit fill at {at} with no open position")]
    NotOpen { at: NaiveDateTime },

    #[error("exit at {exit} is not after entry at {entry} (trade {id})")]
    ExitNotAfterEntry {
        id: TradeId,
        entry: NaiveDateTime,
        exit: NaiveDateTime,
    },

    #[error("commission must be a fraction in [0, 1), got {0}")]
    BadCommission(f64),
}

/// One per-tick return: 0 while flat, else `close[t]/close[t-1] - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub struct TradeLedger {
    commission: f64,
    open: Option<Position>,
    closed: Vec<ClosedTrade>,
    returns: Vec<ReturnPoint>,
    next_id: TradeId,
}

impl TradeLedger {
    pub const DEFAULT_COMMISSION: f64 = 0.002;

    pub fn new(commission: f64) -> Result<Self, LedgerError> {
        if !(commission.is_finite() && (0.0..1.0).contains(&commission)) {
            return Err(LedgerError::BadCommission(commission));
        }
        Ok(Self {
            commission,
            open: None,
            closed: Vec::new(),
            returns: Vec::new(),
            next_id: TradeId::FIRST,
        })
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    pub fn open_position(&self) -> Option<&Position> {
        self.open.as_ref()
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed
    }

    pub fn returns(&self) -> &[ReturnPoint] {
        &self.returns
    }

    /// Consume the ledger into its closed trades and return series.
    pub fn into_parts(self) -> (Vec<ClosedTrade>, Vec<ReturnPoint>) {
        (self.closed, self.returns)
    }

    /// Market tick. Needs the two latest bars; fewer is skipped.
    pub fn on_market(&mut self, window: &[Bar]) {
        let [.., prev, curr] = window else {
            return;
        };
        let value = match self.open {
            Some(_) => curr.close / prev.close - 1.0,
            None => 0.0,
        };
        self.returns.push(ReturnPoint {
            timestamp: curr.timestamp,
            value,
        });
    }

    pub fn on_signal(&self, signal: SignalInfo) -> OrderTicket {
        OrderTicket::from(signal)
    }

    pub fn on_order(&self, order: OrderTicket) -> FillInfo {
        FillInfo::from_order(order, self.commission)
    }

    /// Apply a fill. Returns the trade it closed, if any.
    pub fn on_fill(&mut self, fill: FillInfo) -> Result<Option<ClosedTrade>, LedgerError> {
        match PositionSide::from_entry(fill.kind) {
            Some(side) => {
                if let Some(open) = &self.open {
                    return Err(LedgerError::AlreadyOpen {
                        open: open.id,
                        at: fill.datetime,
                    });
                }
                let position = Position {
                    id: self.next_id,
                    side,
                    entry_date: fill.datetime,
                    entry_price: fill.fill_price,
                };
                info!(id = %position.id, kind = %fill.kind, price = position.entry_price, at = %fill.datetime, "opened position");
                self.next_id = self.next_id.next();
                self.open = Some(position);
                Ok(None)
            }
            None => {
                let position = self
                    .open
                    .take()
                    .ok_or(LedgerError::NotOpen { at: fill.datetime })?;
                if fill.datetime <= position.entry_date {
                    let err = LedgerError::ExitNotAfterEntry {
                        id: position.id,
                        entry: position.entry_date,
                        exit: fill.datetime,
                    };
                    self.open = Some(position);
                    return Err(err);
                }
                let trade = ClosedTrade::close(position, fill.datetime, fill.fill_price, fill.kind);
                info!(id = %trade.id, kind = %trade.exit_type, pnl_pct = trade.pnl_pct, at = %trade.exit_date, "closed trade");
                self.closed.push(trade.clone());
                Ok(Some(trade))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExitReason, IndicatorSet, SignalKind};
    use chrono::NaiveDate;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            timestamp: at(day),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
            indicators: IndicatorSet::undefined(),
        }
    }

    fn fill(ledger: &TradeLedger, day: u32, price: f64, kind: SignalKind) -> FillInfo {
        let order = ledger.on_signal(SignalInfo {
            datetime: at(day),
            price,
            kind,
        });
        ledger.on_order(order)
    }

    const EXIT: SignalKind = SignalKind::Exit(ExitReason::Crossover);

    #[test]
    fn round_trip_applies_commission_both_ways() {
        let mut ledger = TradeLedger::new(0.002).unwrap();
        let entry = fill(&ledger, 1, 100.0, SignalKind::Long);
        assert!((entry.fill_price - 100.2).abs() < 1e-9);
        assert!(ledger.on_fill(entry).unwrap().is_none());
        assert_eq!(ledger.open_position().unwrap().id, TradeId(1));

        let exit = fill(&ledger, 5, 110.0, EXIT);
        let trade = ledger.on_fill(exit).unwrap().unwrap();
        assert!((trade.exit_price - 109.78).abs() < 1e-9);
        let expected = (109.78 / 100.2 - 1.0) * 100.0;
        assert!((trade.pnl_pct - expected).abs() < 1e-9);
        assert!(ledger.open_position().is_none());
        assert_eq!(ledger.closed_trades().len(), 1);
    }

    #[test]
    fn trade_ids_increase() {
        let mut ledger = TradeLedger::new(0.0).unwrap();
        for (entry, exit) in [(1, 2), (3, 4)] {
            ledger.on_fill(fill(&ledger, entry, 10.0, SignalKind::Long)).unwrap();
            ledger.on_fill(fill(&ledger, exit, 11.0, EXIT)).unwrap();
        }
        let ids: Vec<TradeId> = ledger.closed_trades().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TradeId(1), TradeId(2)]);
    }

    #[test]
    fn rejects_double_entry_and_orphan_exit() {
        let mut ledger = TradeLedger::new(0.0).unwrap();
        assert!(matches!(
            ledger.on_fill(fill(&ledger, 1, 10.0, EXIT)),
            Err(LedgerError::NotOpen { .. })
        ));
        ledger.on_fill(fill(&ledger, 1, 10.0, SignalKind::Long)).unwrap();
        assert!(matches!(
            ledger.on_fill(fill(&ledger, 2, 10.0, SignalKind::Short)),
            Err(LedgerError::AlreadyOpen { .. })
        ));
    }

    #[test]
    fn exit_must_follow_entry() {
        let mut ledger = TradeLedger::new(0.0).unwrap();
        ledger.on_fill(fill(&ledger, 3, 10.0, SignalKind::Long)).unwrap();
        assert!(matches!(
            ledger.on_fill(fill(&ledger, 3, 11.0, EXIT)),
            Err(LedgerError::ExitNotAfterEntry { .. })
        ));
        // the position survives the rejected exit
        assert!(ledger.open_position().is_some());
    }

    #[test]
    fn returns_track_position_state() {
        let mut ledger = TradeLedger::new(0.0).unwrap();
        ledger.on_market(&[bar(1, 100.0)]);
        assert!(ledger.returns().is_empty());

        ledger.on_market(&[bar(1, 100.0), bar(2, 102.0)]);
        assert_eq!(ledger.returns()[0].value, 0.0);

        ledger.on_fill(fill(&ledger, 2, 102.0, SignalKind::Long)).unwrap();
        ledger.on_market(&[bar(2, 102.0), bar(3, 104.04)]);
        assert!((ledger.returns()[1].value - 0.02).abs() < 1e-12);
        assert_eq!(ledger.returns()[1].timestamp, at(3));
    }

    #[test]
    fn commission_bounds() {
        assert!(TradeLedger::new(-0.1).is_err());
        assert!(TradeLedger::new(1.0).is_err());
        assert!(TradeLedger::new(f64::NAN).is_err());
    }
}
