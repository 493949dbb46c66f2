//! Rolling dispersion: variance, standard deviation and mean deviation.
//!
//! All three are population statistics (divide by N, not N-1) over the last
//! min(n, i+1) inputs, measured around the SMA of the same window.

use std::sync::Arc;

use crate::domain::error::TaError;
use crate::domain::indicator::sma::Sma;
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};

fn window_start(index: usize, period: usize) -> usize {
    (index + 1).saturating_sub(period)
}

pub struct VarianceFormula {
    input: NumIndicator,
    mean: Sma,
    period: usize,
}

impl Formula for VarianceFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        let start = window_start(index, self.period);
        let mean = self.mean.value(index);
        let sum_sq: f64 = (start..=index)
            .map(|i| {
                let diff = self.input.value(i) - mean;
                diff * diff
            })
            .sum();
        sum_sq / (index + 1 - start) as f64
    }

    fn unstable_bars(&self) -> usize {
        self.mean.unstable_bars()
    }
}

pub type Variance = Cached<VarianceFormula>;

impl Variance {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        let mean = Sma::new(input.clone(), period)?;
        let series = input.series().clone();
        Ok(Cached::from_formula(
            series,
            VarianceFormula {
                input,
                mean,
                period,
            },
        ))
    }
}

pub struct StdDevFormula {
    variance: Variance,
}

impl Formula for StdDevFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        self.variance.value(index).sqrt()
    }

    fn unstable_bars(&self) -> usize {
        self.variance.unstable_bars()
    }
}

pub type StdDev = Cached<StdDevFormula>;

impl StdDev {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        let series = input.series().clone();
        Ok(Cached::from_formula(
            series,
            StdDevFormula {
                variance: Variance::new(input, period)?,
            },
        ))
    }
}

/// Mean absolute deviation around the window's SMA.
pub struct MeanDeviationFormula {
    input: NumIndicator,
    mean: Arc<Sma>,
    period: usize,
}

impl Formula for MeanDeviationFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        let start = window_start(index, self.period);
        let mean = self.mean.value(index);
        let total: f64 = (start..=index)
            .map(|i| (self.input.value(i) - mean).abs())
            .sum();
        total / (index + 1 - start) as f64
    }

    fn unstable_bars(&self) -> usize {
        self.mean.unstable_bars()
    }
}

pub type MeanDeviation = Cached<MeanDeviationFormula>;

impl MeanDeviation {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        let mean = Arc::new(Sma::new(input.clone(), period)?);
        Ok(Self::with_mean(input, mean))
    }

    /// Reuse an SMA the caller already holds over the same input and period.
    pub fn with_mean(input: NumIndicator, mean: Arc<Sma>) -> Self {
        let series = input.series().clone();
        let period = mean.period();
        Cached::from_formula(
            series,
            MeanDeviationFormula {
                input,
                mean,
                period,
            },
        )
    }
}
