//! Trade ledger: single-position lifecycle and per-tick returns.

pub mod ledger;

pub use ledger::{LedgerError, ReturnPoint, TradeLedger};
