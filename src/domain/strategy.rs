//! Strategies: an entry rule and an exit rule behind a warm-up gate.
//!
//! A strategy holds no per-run state. It reads the current position from the
//! trading record it is handed, so the same strategy can drive any number of
//! independent backtests.

use std::fmt;

use tracing::trace;

use crate::domain::position::PositionState;
use crate::domain::rule::{RuleExt, SharedRule};
use crate::domain::trading_record::TradingRecord;

#[derive(Clone)]
pub struct Strategy {
    name: String,
    entry_rule: SharedRule,
    exit_rule: SharedRule,
    unstable_bars: usize,
}

impl Strategy {
    pub fn new(name: impl Into<String>, entry_rule: SharedRule, exit_rule: SharedRule) -> Self {
        Strategy {
            name: name.into(),
            entry_rule,
            exit_rule,
            unstable_bars: 0,
        }
    }

    pub fn with_unstable_bars(mut self, unstable_bars: usize) -> Self {
        self.unstable_bars = unstable_bars;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_rule(&self) -> &SharedRule {
        &self.entry_rule
    }

    pub fn exit_rule(&self) -> &SharedRule {
        &self.exit_rule
    }

    pub fn unstable_bars(&self) -> usize {
        self.unstable_bars
    }

    pub fn is_unstable_at(&self, index: usize) -> bool {
        index < self.unstable_bars
    }

    pub fn should_enter(&self, index: usize, record: Option<&TradingRecord>) -> bool {
        let enter = !self.is_unstable_at(index) && self.entry_rule.is_satisfied(index, record);
        trace!(strategy = %self.name, index, enter, "should enter");
        enter
    }

    pub fn should_exit(&self, index: usize, record: Option<&TradingRecord>) -> bool {
        let exit = !self.is_unstable_at(index) && self.exit_rule.is_satisfied(index, record);
        trace!(strategy = %self.name, index, exit, "should exit");
        exit
    }

    /// Entry check when flat, exit check when a position is open.
    pub fn should_operate(&self, index: usize, record: &TradingRecord) -> bool {
        match record.current_state() {
            PositionState::New => self.should_enter(index, Some(record)),
            PositionState::Opened => self.should_exit(index, Some(record)),
            PositionState::Closed => false,
        }
    }

    /// Both strategies must agree; warm-up is the longer of the two.
    pub fn and(&self, other: &Strategy) -> Strategy {
        let name = format!("and({},{})", self.name, other.name);
        let unstable_bars = self.unstable_bars.max(other.unstable_bars);
        self.and_with(name, other, unstable_bars)
    }

    pub fn and_with(&self, name: impl Into<String>, other: &Strategy, unstable_bars: usize) -> Strategy {
        Strategy {
            name: name.into(),
            entry_rule: self.entry_rule.and(&other.entry_rule),
            exit_rule: self.exit_rule.and(&other.exit_rule),
            unstable_bars,
        }
    }

    /// Either strategy may signal; warm-up is the longer of the two.
    pub fn or(&self, other: &Strategy) -> Strategy {
        let name = format!("or({},{})", self.name, other.name);
        let unstable_bars = self.unstable_bars.max(other.unstable_bars);
        self.or_with(name, other, unstable_bars)
    }

    pub fn or_with(&self, name: impl Into<String>, other: &Strategy, unstable_bars: usize) -> Strategy {
        Strategy {
            name: name.into(),
            entry_rule: self.entry_rule.or(&other.entry_rule),
            exit_rule: self.exit_rule.or(&other.exit_rule),
            unstable_bars,
        }
    }

    /// Entry and exit rules swapped.
    pub fn opposite(&self) -> Strategy {
        Strategy {
            name: format!("opposite({})", self.name),
            entry_rule: self.exit_rule.clone(),
            exit_rule: self.entry_rule.clone(),
            unstable_bars: self.unstable_bars,
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("unstable_bars", &self.unstable_bars)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::BooleanRule;
    use crate::domain::trade::TradeType;
    use std::sync::Arc;

    fn rule(value: bool) -> SharedRule {
        Arc::new(BooleanRule(value))
    }

    fn always(name: &str) -> Strategy {
        Strategy::new(name, rule(true), rule(true))
    }

    #[test]
    fn unstable_bars_gate_signals() {
        let strategy = always("s").with_unstable_bars(3);
        for i in 0..3 {
            assert!(strategy.is_unstable_at(i));
            assert!(!strategy.should_enter(i, None));
            assert!(!strategy.should_exit(i, None));
        }
        assert!(strategy.should_enter(3, None));
        assert!(strategy.should_exit(3, None));
    }

    #[test]
    fn should_operate_follows_position_state() {
        let strategy = Strategy::new("s", rule(true), rule(false));
        let mut record = TradingRecord::new(TradeType::Buy);
        assert!(strategy.should_operate(0, &record));
        record.enter(0, 10.0, 1.0).unwrap();
        assert!(!strategy.should_operate(1, &record));
    }

    #[test]
    fn and_or_combine_rules_and_warmup() {
        let a = Strategy::new("a", rule(true), rule(false)).with_unstable_bars(2);
        let b = Strategy::new("b", rule(false), rule(true)).with_unstable_bars(5);

        let both = a.and(&b);
        assert_eq!(both.name(), "and(a,b)");
        assert_eq!(both.unstable_bars(), 5);
        assert!(!both.should_enter(10, None));
        assert!(!both.should_exit(10, None));

        let either = a.or(&b);
        assert_eq!(either.name(), "or(a,b)");
        assert!(either.should_enter(10, None));
        assert!(either.should_exit(10, None));

        let custom = a.and_with("custom", &b, 1);
        assert_eq!(custom.unstable_bars(), 1);
        assert_eq!(a.or_with("x", &b, 0).name(), "x");
    }

    #[test]
    fn opposite_swaps_rules() {
        let s = Strategy::new("s", rule(true), rule(false)).with_unstable_bars(1);
        let o = s.opposite();
        assert_eq!(o.name(), "opposite(s)");
        assert_eq!(o.unstable_bars(), 1);
        assert!(!o.should_enter(1, None));
        assert!(o.should_exit(1, None));
    }

    #[test]
    fn strategy_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Strategy>();
    }
}
