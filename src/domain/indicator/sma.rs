//! Simple Moving Average.
//!
//! SMA[i] = mean of the last min(n, i+1) inputs, so the first n-1 bars hold a
//! partial average rather than NaN.

use crate::domain::error::{TaError, require_period};
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};

pub struct SmaFormula {
    input: NumIndicator,
    period: usize,
}

impl Formula for SmaFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        let window = self.period.min(index + 1);
        let start = index + 1 - window;
        let sum: f64 = (start..=index).map(|i| self.input.value(i)).sum();
        sum / window as f64
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + self.period
    }
}

pub type Sma = Cached<SmaFormula>;

impl Sma {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        require_period("period", period)?;
        let series = input.series().clone();
        Ok(Cached::from_formula(series, SmaFormula { input, period }))
    }

    pub fn period(&self) -> usize {
        self.formula().period
    }
}
