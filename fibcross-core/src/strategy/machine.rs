//! `CrossoverStrategy`: Flat / Long / Short driven by the dual crossover.
//!
//! ```text
//!   Flat --bullish--> Long --bearish | stop | cover--> Flat
//!   Flat --bearish--> Short --bullish | stop | cover--> Flat   (allow_short)
//! ```

use super::crossover::{detect, Crossover};
use super::intraday::{IntradayRules, IntradayState};
use super::{PositionState, Strategy};
use crate::domain::{Bar, ExitReason, SignalInfo, SignalKind};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub allow_short: bool,
    pub intraday: Option<IntradayRules>,
}

#[derive(Debug, Clone)]
pub struct CrossoverStrategy {
    allow_short: bool,
    intraday: Option<IntradayState>,
    state: PositionState,
    entry_price: f64,
}

impl CrossoverStrategy {
    /// Long-only, no intraday rules.
    pub fn long_only() -> Self {
        Self::new(StrategySettings::default())
    }

    pub fn new(settings: StrategySettings) -> Self {
        Self {
            allow_short: settings.allow_short,
            intraday: settings.intraday.map(IntradayState::new),
            state: PositionState::Flat,
            entry_price: f64::NAN,
        }
    }

    pub fn allows_short(&self) -> bool {
        self.allow_short
    }

    pub fn intraday(&self) -> Option<&IntradayState> {
        self.intraday.as_ref()
    }

    fn signal(&mut self, bar: &Bar, kind: SignalKind) -> SignalInfo {
        self.state = match kind {
            SignalKind::Long => PositionState::Long,
            SignalKind::Short => PositionState::Short,
            SignalKind::Exit(_) => PositionState::Flat,
        };
        if kind.is_entry() {
            self.entry_price = bar.close;
        }
        info!(kind = %kind, at = %bar.timestamp, price = bar.close, "signal");
        SignalInfo {
            datetime: bar.timestamp,
            price: bar.close,
            kind,
        }
    }
}

impl Strategy for CrossoverStrategy {
    fn name(&self) -> &str {
        "fib_crossover"
    }

    fn on_market(&mut self, window: &[Bar]) -> Option<SignalInfo> {
        let current = window.last()?;
        if let Some(intraday) = self.intraday.as_mut() {
            intraday.observe(current);
        }
        if window.len() < 2 {
            return None;
        }
        let prior = &window[window.len() - 2];
        let crossover = detect(&prior.indicators, &current.indicators);

        match self.state.side() {
            Some(side) => {
                let stop_or_cover = self
                    .intraday
                    .as_ref()
                    .and_then(|s| s.exit_reason(side, self.entry_price, current.close));
                let crossover_exit = match (self.state, crossover) {
                    (PositionState::Long, Some(Crossover::Bearish))
                    | (PositionState::Short, Some(Crossover::Bullish)) => Some(ExitReason::Crossover),
                    _ => None,
                };
                let reason = stop_or_cover.or(crossover_exit)?;
                Some(self.signal(current, SignalKind::Exit(reason)))
            }
            None => {
                let allowed = self
                    .intraday
                    .as_ref()
                    .map_or(true, |s| s.entries_allowed(current.timestamp));
                if !allowed {
                    return None;
                }
                match crossover? {
                    Crossover::Bullish => Some(self.signal(current, SignalKind::Long)),
                    Crossover::Bearish if self.allow_short => {
                        Some(self.signal(current, SignalKind::Short))
                    }
                    Crossover::Bearish => None,
                }
            }
        }
    }

    fn position(&self) -> PositionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IndicatorSet;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            + chrono::Duration::minutes(minute)
    }

    fn bar(minute: i64, close: f64, fib: f64, fast: f64, high: f64) -> Bar {
        Bar {
            timestamp: at(minute),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            indicators: IndicatorSet {
                fib_pred: fib,
                fast_pred: fast,
                high_pred: high,
                ..IndicatorSet::undefined()
            },
        }
    }

    fn below(minute: i64, close: f64) -> Bar {
        bar(minute, close, 10.0, 20.0, 30.0)
    }

    fn above(minute: i64, close: f64) -> Bar {
        bar(minute, close, 40.0, 25.0, 35.0)
    }

    #[test]
    fn enters_long_on_bullish_crossover() {
        let mut strategy = CrossoverStrategy::long_only();
        let window = [below(0, 100.0), above(1, 101.0)];
        let signal = strategy.on_market(&window).unwrap();
        assert_eq!(signal.kind, SignalKind::Long);
        assert_eq!(signal.price, 101.0);
        assert_eq!(signal.datetime, at(1));
        assert_eq!(strategy.position(), PositionState::Long);
    }

    #[test]
    fn single_bar_is_a_noop() {
        let mut strategy = CrossoverStrategy::long_only();
        assert!(strategy.on_market(&[above(0, 100.0)]).is_none());
        assert!(strategy.on_market(&[]).is_none());
    }

    #[test]
    fn no_second_entry_while_long() {
        let mut strategy = CrossoverStrategy::long_only();
        strategy.on_market(&[below(0, 100.0), above(1, 101.0)]);
        assert!(strategy.on_market(&[below(2, 100.0), above(3, 101.0)]).is_none());
        assert_eq!(strategy.position(), PositionState::Long);
    }

    #[test]
    fn exits_on_bearish_crossover() {
        let mut strategy = CrossoverStrategy::long_only();
        strategy.on_market(&[below(0, 100.0), above(1, 101.0)]);
        let exit = strategy.on_market(&[above(2, 105.0), below(3, 104.0)]).unwrap();
        assert_eq!(exit.kind, SignalKind::Exit(ExitReason::Crossover));
        assert_eq!(exit.price, 104.0);
        assert!(strategy.position().is_flat());
    }

    #[test]
    fn long_only_ignores_bearish_when_flat() {
        let mut strategy = CrossoverStrategy::long_only();
        assert!(strategy.on_market(&[above(0, 100.0), below(1, 99.0)]).is_none());
    }

    #[test]
    fn shorts_when_enabled() {
        let mut strategy = CrossoverStrategy::new(StrategySettings {
            allow_short: true,
            intraday: None,
        });
        let entry = strategy.on_market(&[above(0, 100.0), below(1, 99.0)]).unwrap();
        assert_eq!(entry.kind, SignalKind::Short);
        let exit = strategy.on_market(&[below(2, 98.0), above(3, 97.0)]).unwrap();
        assert_eq!(exit.kind, SignalKind::Exit(ExitReason::Crossover));
    }

    #[test]
    fn intraday_wait_blocks_then_stop_exits() {
        let rules = IntradayRules {
            stop_loss_pct: 0.01,
            cover_pct: 0.5,
            wait_minutes: 30,
            ..IntradayRules::default()
        };
        let mut strategy = CrossoverStrategy::new(StrategySettings {
            allow_short: false,
            intraday: Some(rules),
        });
        // crossover inside the wait window is refused
        assert!(strategy.on_market(&[below(0, 100.0), above(1, 100.0)]).is_none());
        assert!(strategy.on_market(&[below(40, 100.0), above(41, 100.0)]).is_some());
        // day high so far is 100; 98 <= 99 stops out without any crossover
        let exit = strategy.on_market(&[above(41, 100.0), above(42, 98.0)]).unwrap();
        assert_eq!(exit.kind, SignalKind::Exit(ExitReason::StopLoss));
    }

    #[test]
    fn cover_takes_precedence_over_crossover_exit() {
        let rules = IntradayRules {
            stop_loss_pct: 0.5,
            cover_pct: 0.02,
            wait_minutes: 0,
            ..IntradayRules::default()
        };
        let mut strategy = CrossoverStrategy::new(StrategySettings {
            allow_short: false,
            intraday: Some(rules),
        });
        strategy.on_market(&[below(0, 100.0), above(1, 100.0)]).unwrap();
        let exit = strategy.on_market(&[above(2, 101.0), below(3, 103.0)]).unwrap();
        assert_eq!(exit.kind, SignalKind::Exit(ExitReason::Cover));
    }
}
