//! Rate of Change.
//!
//! ROC(n)[i] = (P[i] - P[i-n]) / P[i-n] * 100, with i-n floored at 0.
//! A zero reference value yields 0.

use crate::domain::error::{TaError, require_period};
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};

pub struct RocFormula {
    input: NumIndicator,
    period: usize,
}

impl Formula for RocFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        let reference = self.input.value(index.saturating_sub(self.period));
        if reference == 0.0 {
            return 0.0;
        }
        (self.input.value(index) - reference) / reference * 100.0
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + self.period
    }
}

pub type Roc = Cached<RocFormula>;

impl Roc {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        require_period("period", period)?;
        let series = input.series().clone();
        Ok(Cached::from_formula(series, RocFormula { input, period }))
    }
}
