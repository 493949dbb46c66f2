//! Commodity Channel Index.
//!
//! CCI = (TP - SMA(TP)) / (0.015 × mean deviation of TP)
//! Zero mean deviation yields 0.

use std::sync::Arc;

use crate::domain::error::TaError;
use crate::domain::indicator::helpers::{PriceField, PriceIndicator};
use crate::domain::indicator::sma::Sma;
use crate::domain::indicator::stddev::MeanDeviation;
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};
use crate::domain::series::BarSeries;

const FACTOR: f64 = 0.015;

pub struct CciFormula {
    typical: NumIndicator,
    mean: Arc<Sma>,
    deviation: MeanDeviation,
}

impl Formula for CciFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        let deviation = self.deviation.value(index);
        if deviation == 0.0 {
            return 0.0;
        }
        (self.typical.value(index) - self.mean.value(index)) / (deviation * FACTOR)
    }

    fn unstable_bars(&self) -> usize {
        self.mean.unstable_bars()
    }
}

pub type Cci = Cached<CciFormula>;

impl Cci {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Result<Self, TaError> {
        let typical: NumIndicator = Arc::new(PriceIndicator::new(series.clone(), PriceField::Typical));
        let mean = Arc::new(Sma::new(typical.clone(), period)?);
        let deviation = MeanDeviation::with_mean(typical.clone(), mean.clone());
        Ok(Cached::from_formula(
            series,
            CciFormula {
                typical,
                mean,
                deviation,
            },
        ))
    }
}
