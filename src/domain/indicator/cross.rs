//! Boolean crossing detector.
//!
//! `Cross::new(up, low)` is true at `index` when `up` has just dropped below
//! `low`: up[index] < low[index], and walking back over bars where the two
//! are equal, the most recent differing bar had up > low. Index 0 never
//! crosses.

use crate::domain::error::TaError;
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator, same_series};

pub struct CrossFormula {
    up: NumIndicator,
    low: NumIndicator,
}

impl Formula for CrossFormula {
    type Output = bool;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> bool {
        if index == 0 {
            return false;
        }
        let below = self.up.value(index) < self.low.value(index);
        if !below {
            return false;
        }
        let mut i = index - 1;
        while i > 0 && self.up.value(i) == self.low.value(i) {
            i -= 1;
        }
        self.up.value(i) > self.low.value(i)
    }

    fn unstable_bars(&self) -> usize {
        self.up.unstable_bars().max(self.low.unstable_bars())
    }
}

pub type Cross = Cached<CrossFormula>;

impl Cross {
    pub fn new(up: NumIndicator, low: NumIndicator) -> Result<Self, TaError> {
        same_series(&up, &low)?;
        let series = up.series().clone();
        Ok(Cached::from_formula(series, CrossFormula { up, low }))
    }

    pub fn up(&self) -> &NumIndicator {
        &self.formula().up
    }

    pub fn low(&self) -> &NumIndicator {
        &self.formula().low
    }
}
