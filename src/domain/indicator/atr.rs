//! Average True Range: Wilder-smoothed true range.

use std::sync::Arc;

use crate::domain::error::TaError;
use crate::domain::indicator::ema::Mma;
use crate::domain::indicator::helpers::TrueRange;
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};
use crate::domain::series::BarSeries;

pub struct AtrFormula {
    average: Mma,
}

impl Formula for AtrFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        self.average.value(index)
    }

    fn unstable_bars(&self) -> usize {
        self.average.unstable_bars()
    }
}

pub type Atr = Cached<AtrFormula>;

impl Atr {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Result<Self, TaError> {
        let tr: NumIndicator = Arc::new(TrueRange::new(series.clone()));
        Ok(Cached::from_formula(
            series,
            AtrFormula {
                average: Mma::new(tr, period)?,
            },
        ))
    }
}
