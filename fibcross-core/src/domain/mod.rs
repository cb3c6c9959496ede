//! Domain types for FibCross

pub mod bar;
pub mod event;
pub mod ids;
pub mod interval;
pub mod trade;

pub use bar::{Bar, IndicatorSet, RawBar};
pub use event::{Event, ExitReason, FillInfo, OrderTicket, SignalInfo, SignalKind};
pub use ids::TradeId;
pub use interval::{BarInterval, IntervalError, IntervalUnit};
pub use trade::{ClosedTrade, Position, PositionSide};

/// Symbol type alias
pub type Symbol = String;
