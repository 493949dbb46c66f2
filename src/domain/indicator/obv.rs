//! On-Balance Volume.
//!
//! OBV[0] = 0. Each later bar adds its volume when the close rose, subtracts
//! it when the close fell, and carries the previous value otherwise.

use std::sync::Arc;

use crate::domain::indicator::{Cached, Formula, Indicator};
use crate::domain::series::BarSeries;

pub struct ObvFormula;

impl Formula for ObvFormula {
    type Output = f64;
    const RECURSIVE: bool = true;

    fn calculate(&self, index: usize, cached: &Cached<Self>) -> f64 {
        if index == 0 {
            return 0.0;
        }
        let series = cached.series();
        let prev_close = series.bar(index - 1).close;
        let bar = series.bar(index);
        let prev = cached.value(index - 1);
        if bar.close > prev_close {
            prev + bar.volume
        } else if bar.close < prev_close {
            prev - bar.volume
        } else {
            prev
        }
    }

    fn unstable_bars(&self) -> usize {
        0
    }
}

pub type Obv = Cached<ObvFormula>;

impl Obv {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Cached::from_formula(series, ObvFormula)
    }
}
