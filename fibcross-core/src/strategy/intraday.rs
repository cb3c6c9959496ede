//! Intraday rules: trailing stop, profit cover, and a post-open wait window.
//!
//! Day high/low trackers follow the session and reset on the bar after the
//! session-close bar (or on a new calendar date). Percentages are fractions.

use crate::domain::{Bar, ExitReason, PositionSide};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IntradayError {
    #[error("{field} must be a fraction in [0, 1), got {value}")]
    BadFraction { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntradayRules {
    /// Drawdown from the day's extreme that stops the trade out.
    pub stop_loss_pct: f64,
    /// Gain over the entry price that takes profit.
    pub cover_pct: f64,
    /// Minutes after the session's first bar before entries are allowed.
    pub wait_minutes: u32,
    /// Time of the last bar of a session.
    pub session_close: NaiveTime,
}

impl Default for IntradayRules {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.01,
            cover_pct: 0.02,
            wait_minutes: 30,
            session_close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl IntradayRules {
    pub fn validate(&self) -> Result<(), IntradayError> {
        for (field, value) in [("stop_loss_pct", self.stop_loss_pct), ("cover_pct", self.cover_pct)] {
            if !(value.is_finite() && (0.0..1.0).contains(&value)) {
                return Err(IntradayError::BadFraction { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Session {
    start: NaiveDateTime,
    high: f64,
    low: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntradayState {
    rules: IntradayRules,
    session: Option<Session>,
    reset_pending: bool,
}

impl IntradayState {
    pub fn new(rules: IntradayRules) -> Self {
        Self {
            rules,
            session: None,
            reset_pending: false,
        }
    }

    pub fn rules(&self) -> &IntradayRules {
        &self.rules
    }

    /// Fold the current bar into the day trackers.
    pub fn observe(&mut self, bar: &Bar) {
        let new_session = self.reset_pending
            || self
                .session
                .map_or(true, |s| s.start.date() != bar.timestamp.date());

        if new_session {
            self.session = Some(Session {
                start: bar.timestamp,
                high: bar.high,
                low: bar.low,
            });
        } else if let Some(session) = self.session.as_mut() {
            session.high = session.high.max(bar.high);
            session.low = session.low.min(bar.low);
        }
        self.reset_pending = bar.timestamp.time() >= self.rules.session_close;
    }

    /// True once `wait_minutes` have passed since the session's first bar.
    pub fn entries_allowed(&self, now: NaiveDateTime) -> bool {
        match self.session {
            Some(s) => now >= s.start + Duration::minutes(i64::from(self.rules.wait_minutes)),
            None => false,
        }
    }

    pub fn day_high(&self) -> Option<f64> {
        self.session.map(|s| s.high)
    }

    pub fn day_low(&self) -> Option<f64> {
        self.session.map(|s| s.low)
    }

    /// Stop is checked before cover.
    pub fn exit_reason(&self, side: PositionSide, entry_price: f64, close: f64) -> Option<ExitReason> {
        let session = self.session?;
        let stop = self.rules.stop_loss_pct;
        let cover = self.rules.cover_pct;
        match side {
            PositionSide::Long => {
                if close <= session.high * (1.0 - stop) {
                    Some(ExitReason::StopLoss)
                } else if close >= entry_price * (1.0 + cover) {
                    Some(ExitReason::Cover)
                } else {
                    None
                }
            }
            PositionSide::Short => {
                if close >= session.low * (1.0 + stop) {
                    Some(ExitReason::StopLoss)
                } else if close <= entry_price * (1.0 - cover) {
                    Some(ExitReason::Cover)
                } else {
                    None
                }
            }
        }
    }
}
