//! Rising/falling rules over the last `bar_count` bars.
//!
//! The rule counts bars in the window whose value is strictly above (rising)
//! or below (falling) the previous bar's, and is satisfied when
//! count / bar_count reaches the minimum strength. A minimum strength of 1 or
//! more is clamped to 0.99.

use crate::domain::error::{TaError, require_period};
use crate::domain::indicator::{Indicator, NumIndicator};
use crate::domain::rule::{Rule, trace_satisfied};
use crate::domain::trading_record::TradingRecord;

const MAX_STRENGTH: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Rising,
    Falling,
}

struct Trend {
    indicator: NumIndicator,
    bar_count: usize,
    min_strength: f64,
    direction: Direction,
}

impl Trend {
    fn new(
        indicator: NumIndicator,
        bar_count: usize,
        min_strength: f64,
        direction: Direction,
    ) -> Result<Self, TaError> {
        require_period("bar_count", bar_count)?;
        if min_strength.is_nan() || min_strength < 0.0 {
            return Err(TaError::invalid(
                "min_strength",
                format!("must be >= 0, got {min_strength}"),
            ));
        }
        let min_strength = if min_strength >= 1.0 {
            MAX_STRENGTH
        } else {
            min_strength
        };
        Ok(Self {
            indicator,
            bar_count,
            min_strength,
            direction,
        })
    }

    fn holds(&self, index: usize) -> bool {
        let start = (index + 1).saturating_sub(self.bar_count);
        let count = (start..=index)
            .filter(|&i| {
                let current = self.indicator.value(i);
                let previous = self.indicator.value(i.saturating_sub(1));
                match self.direction {
                    Direction::Rising => current > previous,
                    Direction::Falling => current < previous,
                }
            })
            .count();
        count as f64 / self.bar_count as f64 >= self.min_strength
    }
}

pub struct IsRisingRule {
    trend: Trend,
}

impl IsRisingRule {
    pub fn new(indicator: NumIndicator, bar_count: usize, min_strength: f64) -> Result<Self, TaError> {
        Ok(Self {
            trend: Trend::new(indicator, bar_count, min_strength, Direction::Rising)?,
        })
    }

    /// Every bar in the window must rise (subject to the strength clamp).
    pub fn strict(indicator: NumIndicator, bar_count: usize) -> Result<Self, TaError> {
        Self::new(indicator, bar_count, 1.0)
    }

    pub fn min_strength(&self) -> f64 {
        self.trend.min_strength
    }
}

impl Rule for IsRisingRule {
    fn is_satisfied(&self, index: usize, _record: Option<&TradingRecord>) -> bool {
        let satisfied = self.trend.holds(index);
        trace_satisfied("IsRisingRule", index, satisfied);
        satisfied
    }
}

pub struct IsFallingRule {
    trend: Trend,
}

impl IsFallingRule {
    pub fn new(indicator: NumIndicator, bar_count: usize, min_strength: f64) -> Result<Self, TaError> {
        Ok(Self {
            trend: Trend::new(indicator, bar_count, min_strength, Direction::Falling)?,
        })
    }

    pub fn strict(indicator: NumIndicator, bar_count: usize) -> Result<Self, TaError> {
        Self::new(indicator, bar_count, 1.0)
    }

    pub fn min_strength(&self) -> f64 {
        self.trend.min_strength
    }
}

impl Rule for IsFallingRule {
    fn is_satisfied(&self, index: usize, _record: Option<&TradingRecord>) -> bool {
        let satisfied = self.trend.holds(index);
        trace_satisfied("IsFallingRule", index, satisfied);
        satisfied
    }
}
