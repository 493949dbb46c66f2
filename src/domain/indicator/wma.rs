//! Weighted Moving Average.
//!
//! WMA(n) = (1*P[i-m+1] + 2*P[i-m+2] + ... + m*P[i]) / (m*(m+1)/2)
//! where m = min(n, i+1).

use crate::domain::error::{TaError, require_period};
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};

pub struct WmaFormula {
    input: NumIndicator,
    period: usize,
}

impl Formula for WmaFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        let window = self.period.min(index + 1);
        let start = index + 1 - window;
        let weighted_sum: f64 = (start..=index)
            .enumerate()
            .map(|(offset, i)| (offset + 1) as f64 * self.input.value(i))
            .sum();
        let divisor = (window * (window + 1)) as f64 / 2.0;
        weighted_sum / divisor
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + self.period
    }
}

pub type Wma = Cached<WmaFormula>;

impl Wma {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        require_period("period", period)?;
        let series = input.series().clone();
        Ok(Cached::from_formula(series, WmaFormula { input, period }))
    }
}
