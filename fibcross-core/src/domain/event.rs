//! The four-stage event vocabulary: Market → Signal → Order → Fill.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    /// Mirrored dual crossover.
    Crossover,
    /// Intraday trailing stop against the high/low of day.
    StopLoss,
    /// Intraday profit target reached.
    Cover,
}

/// What a signal asks the ledger to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    Long,
    Short,
    Exit(ExitReason),
}

impl SignalKind {
    pub fn is_entry(&self) -> bool {
        matches!(self, SignalKind::Long | SignalKind::Short)
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, SignalKind::Exit(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::Long => "Long",
            SignalKind::Short => "Short",
            SignalKind::Exit(ExitReason::Crossover) => "Exit",
            SignalKind::Exit(ExitReason::StopLoss) => "Exit Stop",
            SignalKind::Exit(ExitReason::Cover) => "Exit Cover",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Payload of a Signal event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalInfo {
    pub datetime: NaiveDateTime,
    /// Reference price (the bar close that triggered the signal).
    pub price: f64,
    pub kind: SignalKind,
}

/// Payload of an Order event. Orders carry the signal through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub datetime: NaiveDateTime,
    pub price: f64,
    pub kind: SignalKind,
}

impl From<SignalInfo> for OrderTicket {
    fn from(signal: SignalInfo) -> Self {
        Self {
            datetime: signal.datetime,
            price: signal.price,
            kind: signal.kind,
        }
    }
}

/// Payload of a Fill event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillInfo {
    pub datetime: NaiveDateTime,
    /// Reference price before commission.
    pub price: f64,
    /// Commission-adjusted execution price.
    pub fill_price: f64,
    pub commission: f64,
    pub kind: SignalKind,
}

impl FillInfo {
    /// Entries pay `price * (1 + commission)`, exits receive `price * (1 - commission)`.
    pub fn from_order(order: OrderTicket, commission: f64) -> Self {
        let fill_price = if order.kind.is_entry() {
            order.price * (1.0 + commission)
        } else {
            order.price * (1.0 - commission)
        };
        Self {
            datetime: order.datetime,
            price: order.price,
            fill_price,
            commission,
            kind: order.kind,
        }
    }
}

/// An event on the bus. Dispatched by exhaustive `match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A new bar has arrived on the feed.
    Market,
    Signal(SignalInfo),
    Order(OrderTicket),
    Fill(FillInfo),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Market => "MARKET",
            Event::Signal(_) => "SIGNAL",
            Event::Order(_) => "ORDER",
            Event::Fill(_) => "FILL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn labels_contain_exit_for_every_exit_reason() {
        for reason in [ExitReason::Crossover, ExitReason::StopLoss, ExitReason::Cover] {
            let kind = SignalKind::Exit(reason);
            assert!(kind.is_exit());
            assert!(kind.label().contains("Exit"));
        }
        assert!(!SignalKind::Long.label().contains("Exit"));
    }

    #[test]
    fn entry_fill_pays_commission() {
        let order = OrderTicket {
            datetime: ts(),
            price: 100.0,
            kind: SignalKind::Long,
        };
        let fill = FillInfo::from_order(order, 0.002);
        assert!((fill.fill_price - 100.2).abs() < 1e-12);
        assert_eq!(fill.price, 100.0);
    }

    #[test]
    fn exit_fill_receives_less() {
        let order = OrderTicket {
            datetime: ts(),
            price: 110.0,
            kind: SignalKind::Exit(ExitReason::Crossover),
        };
        let fill = FillInfo::from_order(order, 0.002);
        assert!((fill.fill_price - 109.78).abs() < 1e-12);
    }

    #[test]
    fn order_ticket_carries_signal_unchanged() {
        let signal = SignalInfo {
            datetime: ts(),
            price: 42.5,
            kind: SignalKind::Short,
        };
        let ticket = OrderTicket::from(signal);
        assert_eq!(ticket.datetime, signal.datetime);
        assert_eq!(ticket.price, signal.price);
        assert_eq!(ticket.kind, signal.kind);
    }
}
