//! Trading rules: boolean predicates over (index, trading record).
//!
//! Rules are stateless and shared through `Arc`, so one assembled rule tree
//! can be evaluated against many independent trading records.

pub mod comparison;
pub mod stop;
pub mod trend;

use std::sync::Arc;

use tracing::trace;

use crate::domain::indicator::{BoolIndicator, Indicator};
use crate::domain::trading_record::TradingRecord;

pub use comparison::{
    CrossedDownIndicatorRule, CrossedUpIndicatorRule, OverIndicatorRule, UnderIndicatorRule,
};
pub use stop::{StopGainRule, StopLossRule};
pub use trend::{IsFallingRule, IsRisingRule};

pub trait Rule: Send + Sync {
    /// Whether the rule holds at `index`. Rules that need trade history
    /// treat a missing record as "no position".
    fn is_satisfied(&self, index: usize, record: Option<&TradingRecord>) -> bool;
}

pub type SharedRule = Arc<dyn Rule>;

pub(crate) fn trace_satisfied(rule: &'static str, index: usize, satisfied: bool) {
    trace!(rule, index, satisfied, "rule evaluated");
}

/// Combinator methods on shared rules.
pub trait RuleExt {
    fn and(&self, other: &SharedRule) -> SharedRule;
    fn or(&self, other: &SharedRule) -> SharedRule;
    fn xor(&self, other: &SharedRule) -> SharedRule;
    fn negation(&self) -> SharedRule;
}

impl RuleExt for SharedRule {
    fn and(&self, other: &SharedRule) -> SharedRule {
        Arc::new(AndRule::new(Arc::clone(self), Arc::clone(other)))
    }

    fn or(&self, other: &SharedRule) -> SharedRule {
        Arc::new(OrRule::new(Arc::clone(self), Arc::clone(other)))
    }

    fn xor(&self, other: &SharedRule) -> SharedRule {
        Arc::new(XorRule::new(Arc::clone(self), Arc::clone(other)))
    }

    fn negation(&self) -> SharedRule {
        Arc::new(NotRule::new(Arc::clone(self)))
    }
}

pub struct AndRule {
    first: SharedRule,
    second: SharedRule,
}

impl AndRule {
    pub fn new(first: SharedRule, second: SharedRule) -> Self {
        Self { first, second }
    }
}

impl Rule for AndRule {
    fn is_satisfied(&self, index: usize, record: Option<&TradingRecord>) -> bool {
        let satisfied =
            self.first.is_satisfied(index, record) && self.second.is_satisfied(index, record);
        trace_satisfied("AndRule", index, satisfied);
        satisfied
    }
}

pub struct OrRule {
    first: SharedRule,
    second: SharedRule,
}

impl OrRule {
    pub fn new(first: SharedRule, second: SharedRule) -> Self {
        Self { first, second }
    }
}

impl Rule for OrRule {
    fn is_satisfied(&self, index: usize, record: Option<&TradingRecord>) -> bool {
        let satisfied =
            self.first.is_satisfied(index, record) || self.second.is_satisfied(index, record);
        trace_satisfied("OrRule", index, satisfied);
        satisfied
    }
}

pub struct XorRule {
    first: SharedRule,
    second: SharedRule,
}

impl XorRule {
    pub fn new(first: SharedRule, second: SharedRule) -> Self {
        Self { first, second }
    }
}

impl Rule for XorRule {
    fn is_satisfied(&self, index: usize, record: Option<&TradingRecord>) -> bool {
        let satisfied =
            self.first.is_satisfied(index, record) ^ self.second.is_satisfied(index, record);
        trace_satisfied("XorRule", index, satisfied);
        satisfied
    }
}

pub struct NotRule {
    inner: SharedRule,
}

impl NotRule {
    pub fn new(inner: SharedRule) -> Self {
        Self { inner }
    }
}

impl Rule for NotRule {
    fn is_satisfied(&self, index: usize, record: Option<&TradingRecord>) -> bool {
        let satisfied = !self.inner.is_satisfied(index, record);
        trace_satisfied("NotRule", index, satisfied);
        satisfied
    }
}

/// Always the same answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanRule(pub bool);

impl BooleanRule {
    pub const TRUE: BooleanRule = BooleanRule(true);
    pub const FALSE: BooleanRule = BooleanRule(false);
}

impl Rule for BooleanRule {
    fn is_satisfied(&self, index: usize, _record: Option<&TradingRecord>) -> bool {
        trace_satisfied("BooleanRule", index, self.0);
        self.0
    }
}

/// Satisfied when a boolean indicator is true at the index.
pub struct BooleanIndicatorRule {
    indicator: BoolIndicator,
}

impl BooleanIndicatorRule {
    pub fn new(indicator: BoolIndicator) -> Self {
        Self { indicator }
    }
}

impl Rule for BooleanIndicatorRule {
    fn is_satisfied(&self, index: usize, _record: Option<&TradingRecord>) -> bool {
        let satisfied = self.indicator.value(index);
        trace_satisfied("BooleanIndicatorRule", index, satisfied);
        satisfied
    }
}
