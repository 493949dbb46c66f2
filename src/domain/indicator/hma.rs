//! Hull Moving Average.
//!
//! HMA(n) = WMA(floor(sqrt(n))) of (2 * WMA(n/2) - WMA(n))

use std::sync::Arc;

use crate::domain::error::TaError;
use crate::domain::indicator::wma::Wma;
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};

pub struct HullSpreadFormula {
    half: Wma,
    full: Wma,
}

impl Formula for HullSpreadFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        2.0 * self.half.value(index) - self.full.value(index)
    }

    fn unstable_bars(&self) -> usize {
        self.half.unstable_bars().max(self.full.unstable_bars())
    }
}

pub struct HmaFormula {
    smoothed: Wma,
    warm_up: usize,
}

impl Formula for HmaFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        self.smoothed.value(index)
    }

    fn unstable_bars(&self) -> usize {
        self.warm_up
    }
}

pub type Hma = Cached<HmaFormula>;

impl Hma {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        if period < 2 {
            return Err(TaError::invalid(
                "period",
                format!("HMA period must be at least 2, got {period}"),
            ));
        }
        let series = input.series().clone();
        let warm_up = input.unstable_bars() + period;
        let spread = Arc::new(Cached::from_formula(
            series.clone(),
            HullSpreadFormula {
                half: Wma::new(input.clone(), period / 2)?,
                full: Wma::new(input, period)?,
            },
        ));
        let sqrt_period = (period as f64).sqrt() as usize;
        Ok(Cached::from_formula(
            series,
            HmaFormula {
                smoothed: Wma::new(spread, sqrt_period)?,
                warm_up,
            },
        ))
    }
}
