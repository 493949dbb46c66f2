//! RSI (Relative Strength Index).
//!
//! Average gain and average loss are Wilder-smoothed (MMA) over n bars.
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! Edge policy: NaN while unstable; 100 when only the average loss is zero;
//! 0 when both averages are zero.

use std::sync::Arc;

use crate::domain::error::{TaError, require_period};
use crate::domain::indicator::ema::Mma;
use crate::domain::indicator::helpers::{Gain, Loss};
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};

pub struct RsiFormula {
    average_gain: Mma,
    average_loss: Mma,
    unstable: usize,
}

impl Formula for RsiFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        if index < self.unstable {
            return f64::NAN;
        }
        let avg_gain = self.average_gain.value(index);
        let avg_loss = self.average_loss.value(index);
        if avg_loss == 0.0 {
            return if avg_gain == 0.0 { 0.0 } else { 100.0 };
        }
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }

    fn unstable_bars(&self) -> usize {
        self.unstable
    }
}

pub type Rsi = Cached<RsiFormula>;

impl Rsi {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        require_period("period", period)?;
        let series = input.series().clone();
        let unstable = input.unstable_bars() + period;
        let gain: NumIndicator = Arc::new(Gain::new(input.clone()));
        let loss: NumIndicator = Arc::new(Loss::new(input));
        Ok(Cached::from_formula(
            series,
            RsiFormula {
                average_gain: Mma::new(gain, period)?,
                average_loss: Mma::new(loss, period)?,
                unstable,
            },
        ))
    }
}
