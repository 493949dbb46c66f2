//! Rules comparing two numeric indicators: strictly over, strictly under,
//! and crossing in either direction.

use std::sync::Arc;

use crate::domain::error::TaError;
use crate::domain::indicator::cross::Cross;
use crate::domain::indicator::helpers::ConstantIndicator;
use crate::domain::indicator::{Indicator, NumIndicator, same_series};
use crate::domain::rule::{Rule, trace_satisfied};
use crate::domain::trading_record::TradingRecord;

fn threshold(indicator: &NumIndicator, value: f64) -> NumIndicator {
    Arc::new(ConstantIndicator::new(indicator.series().clone(), value))
}

/// first > second, strictly. NaN on either side is never over.
pub struct OverIndicatorRule {
    first: NumIndicator,
    second: NumIndicator,
}

impl OverIndicatorRule {
    pub fn new(first: NumIndicator, second: NumIndicator) -> Result<Self, TaError> {
        same_series(&first, &second)?;
        Ok(Self { first, second })
    }

    pub fn with_threshold(indicator: NumIndicator, value: f64) -> Self {
        let second = threshold(&indicator, value);
        Self {
            first: indicator,
            second,
        }
    }
}

impl Rule for OverIndicatorRule {
    fn is_satisfied(&self, index: usize, _record: Option<&TradingRecord>) -> bool {
        let satisfied = self.first.value(index) > self.second.value(index);
        trace_satisfied("OverIndicatorRule", index, satisfied);
        satisfied
    }
}

/// first < second, strictly.
pub struct UnderIndicatorRule {
    first: NumIndicator,
    second: NumIndicator,
}

impl UnderIndicatorRule {
    pub fn new(first: NumIndicator, second: NumIndicator) -> Result<Self, TaError> {
        same_series(&first, &second)?;
        Ok(Self { first, second })
    }

    pub fn with_threshold(indicator: NumIndicator, value: f64) -> Self {
        let second = threshold(&indicator, value);
        Self {
            first: indicator,
            second,
        }
    }
}

impl Rule for UnderIndicatorRule {
    fn is_satisfied(&self, index: usize, _record: Option<&TradingRecord>) -> bool {
        let satisfied = self.first.value(index) < self.second.value(index);
        trace_satisfied("UnderIndicatorRule", index, satisfied);
        satisfied
    }
}

/// Satisfied on the bar where `first` moves from at-or-below `second` to
/// strictly above it.
pub struct CrossedUpIndicatorRule {
    cross: Cross,
}

impl CrossedUpIndicatorRule {
    pub fn new(first: NumIndicator, second: NumIndicator) -> Result<Self, TaError> {
        Ok(Self {
            cross: Cross::new(second, first)?,
        })
    }

    pub fn with_threshold(indicator: NumIndicator, value: f64) -> Result<Self, TaError> {
        let level = threshold(&indicator, value);
        Self::new(indicator, level)
    }

    pub fn unstable_bars(&self) -> usize {
        self.cross.unstable_bars()
    }
}

impl Rule for CrossedUpIndicatorRule {
    fn is_satisfied(&self, index: usize, _record: Option<&TradingRecord>) -> bool {
        let satisfied = self.cross.value(index);
        trace_satisfied("CrossedUpIndicatorRule", index, satisfied);
        satisfied
    }
}

/// Satisfied on the bar where `first` moves from at-or-above `second` to
/// strictly below it.
pub struct CrossedDownIndicatorRule {
    cross: Cross,
}

impl CrossedDownIndicatorRule {
    pub fn new(first: NumIndicator, second: NumIndicator) -> Result<Self, TaError> {
        Ok(Self {
            cross: Cross::new(first, second)?,
        })
    }

    pub fn with_threshold(indicator: NumIndicator, value: f64) -> Result<Self, TaError> {
        let level = threshold(&indicator, value);
        Self::new(indicator, level)
    }

    pub fn unstable_bars(&self) -> usize {
        self.cross.unstable_bars()
    }
}

impl Rule for CrossedDownIndicatorRule {
    fn is_satisfied(&self, index: usize, _record: Option<&TradingRecord>) -> bool {
        let satisfied = self.cross.value(index);
        trace_satisfied("CrossedDownIndicatorRule", index, satisfied);
        satisfied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::sma::Sma;
    use crate::domain::indicator::test_support::*;

    #[test]
    fn over_and_under_are_strict() {
        let series = series_from_closes(&[9.0, 10.0, 11.0]);
        let over = OverIndicatorRule::with_threshold(close(&series), 10.0);
        let under = UnderIndicatorRule::with_threshold(close(&series), 10.0);
        assert_eq!(
            (0..3).map(|i| over.is_satisfied(i, None)).collect::<Vec<_>>(),
            vec![false, false, true]
        );
        assert_eq!(
            (0..3).map(|i| under.is_satisfied(i, None)).collect::<Vec<_>>(),
            vec![true, false, false]
        );
    }

    #[test]
    fn nan_is_neither_over_nor_under() {
        let series = series_from_closes(&[f64::NAN]);
        assert!(!OverIndicatorRule::with_threshold(close(&series), 0.0).is_satisfied(0, None));
        assert!(!UnderIndicatorRule::with_threshold(close(&series), 0.0).is_satisfied(0, None));
    }

    #[test]
    fn crossed_up_close_over_sma() {
        let series = series_from_closes(&[5.0, 4.0, 3.0, 2.0, 3.0, 4.0, 5.0, 6.0, 5.0, 4.0, 3.0]);
        let sma: NumIndicator = Arc::new(Sma::new(close(&series), 3).unwrap());
        let up = CrossedUpIndicatorRule::new(close(&series), sma.clone()).unwrap();
        let down = CrossedDownIndicatorRule::new(close(&series), sma).unwrap();

        let ups: Vec<usize> = (0..11).filter(|&i| up.is_satisfied(i, None)).collect();
        let downs: Vec<usize> = (0..11).filter(|&i| down.is_satisfied(i, None)).collect();
        assert_eq!(ups, vec![4]);
        assert_eq!(downs, vec![8]);
        assert_eq!(up.unstable_bars(), 3);
    }

    #[test]
    fn crossed_thresholds() {
        let series = series_from_closes(&[40.0, 20.0, 35.0, 80.0, 60.0]);
        let up = CrossedUpIndicatorRule::with_threshold(close(&series), 30.0).unwrap();
        let down = CrossedDownIndicatorRule::with_threshold(close(&series), 70.0).unwrap();
        assert!(up.is_satisfied(2, None));
        assert!(!up.is_satisfied(3, None));
        assert!(down.is_satisfied(4, None));
    }

    #[test]
    fn operands_from_different_series_rejected() {
        let a = close(&series_from_closes(&[1.0]));
        let b = close(&series_from_closes(&[1.0]));
        assert!(OverIndicatorRule::new(a.clone(), b.clone()).is_err());
        assert!(CrossedUpIndicatorRule::new(a, b).is_err());
    }
}
