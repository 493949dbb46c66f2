//! Exponential moving averages.
//!
//! EMA: k = 2/(n+1). MMA (Wilder's modified moving average): k = 1/n.
//! Both seed with the first input value, then
//! X[i] = X[i-1] + k * (input[i] - X[i-1]).
//! A NaN previous value restarts the average from the current input.

use crate::domain::error::{TaError, require_period};
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};

fn smooth<F>(input: &NumIndicator, multiplier: f64, index: usize, cached: &Cached<F>) -> f64
where
    F: Formula<Output = f64>,
{
    let current = input.value(index);
    if index == 0 {
        return current;
    }
    let prev = cached.value(index - 1);
    if prev.is_nan() {
        return current;
    }
    (current - prev) * multiplier + prev
}

pub struct EmaFormula {
    input: NumIndicator,
    period: usize,
    multiplier: f64,
}

impl Formula for EmaFormula {
    type Output = f64;
    const RECURSIVE: bool = true;

    fn calculate(&self, index: usize, cached: &Cached<Self>) -> f64 {
        smooth(&self.input, self.multiplier, index, cached)
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + self.period
    }
}

pub type Ema = Cached<EmaFormula>;

impl Ema {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        require_period("period", period)?;
        let series = input.series().clone();
        Ok(Cached::from_formula(
            series,
            EmaFormula {
                input,
                period,
                multiplier: 2.0 / (period as f64 + 1.0),
            },
        ))
    }

    pub fn period(&self) -> usize {
        self.formula().period
    }
}

pub struct MmaFormula {
    input: NumIndicator,
    period: usize,
    multiplier: f64,
}

impl Formula for MmaFormula {
    type Output = f64;
    const RECURSIVE: bool = true;

    fn calculate(&self, index: usize, cached: &Cached<Self>) -> f64 {
        smooth(&self.input, self.multiplier, index, cached)
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + self.period
    }
}

pub type Mma = Cached<MmaFormula>;

impl Mma {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        require_period("period", period)?;
        let series = input.series().clone();
        Ok(Cached::from_formula(
            series,
            MmaFormula {
                input,
                period,
                multiplier: 1.0 / period as f64,
            },
        ))
    }
}
