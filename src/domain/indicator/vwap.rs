//! Volume-Weighted Average Price over a rolling window of typical prices.
//! A window with no volume reports the current typical price.

use std::sync::Arc;

use crate::domain::error::{TaError, require_period};
use crate::domain::indicator::{Cached, Formula, Indicator};
use crate::domain::series::BarSeries;

pub struct VwapFormula {
    period: usize,
}

impl Formula for VwapFormula {
    type Output = f64;

    fn calculate(&self, index: usize, cached: &Cached<Self>) -> f64 {
        let series = cached.series();
        let typical = series.bar(index).typical_price();
        if index == 0 {
            return typical;
        }
        let start = (index + 1).saturating_sub(self.period);
        let (tpv, volume) = series.bars()[start..=index]
            .iter()
            .fold((0.0, 0.0), |(tpv, volume), bar| {
                (tpv + bar.typical_price() * bar.volume, volume + bar.volume)
            });
        if volume == 0.0 {
            return typical;
        }
        tpv / volume
    }

    fn unstable_bars(&self) -> usize {
        self.period
    }
}

pub type Vwap = Cached<VwapFormula>;

impl Vwap {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Result<Self, TaError> {
        require_period("period", period)?;
        Ok(Cached::from_formula(series, VwapFormula { period }))
    }
}
