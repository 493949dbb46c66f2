//! Range oscillators: stochastic %K and Williams %R.
//!
//! %K = (close - lowest low) / (highest high - lowest low) × 100
//! %R = (highest high - close) / (highest high - lowest low) × -100
//!
//! A zero high-low range yields 50 for %K and -50 for %R.

use std::sync::Arc;

use crate::domain::error::TaError;
use crate::domain::indicator::helpers::{Highest, Lowest, PriceField, PriceIndicator};
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};
use crate::domain::series::BarSeries;

struct Range {
    close: NumIndicator,
    highest: Highest,
    lowest: Lowest,
    period: usize,
}

impl Range {
    fn new(series: &Arc<BarSeries>, period: usize) -> Result<Self, TaError> {
        let price = |field| -> NumIndicator { Arc::new(PriceIndicator::new(series.clone(), field)) };
        Ok(Self {
            close: price(PriceField::Close),
            highest: Highest::new(price(PriceField::High), period)?,
            lowest: Lowest::new(price(PriceField::Low), period)?,
            period,
        })
    }

    /// (close, highest high, lowest low) at `index`.
    fn at(&self, index: usize) -> (f64, f64, f64) {
        (
            self.close.value(index),
            self.highest.value(index),
            self.lowest.value(index),
        )
    }
}

pub struct StochasticKFormula {
    range: Range,
}

impl Formula for StochasticKFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        let (close, high, low) = self.range.at(index);
        let width = high - low;
        if width == 0.0 {
            return 50.0;
        }
        (close - low) / width * 100.0
    }

    fn unstable_bars(&self) -> usize {
        self.range.period
    }
}

pub type StochasticK = Cached<StochasticKFormula>;

impl StochasticK {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Result<Self, TaError> {
        let range = Range::new(&series, period)?;
        Ok(Cached::from_formula(series, StochasticKFormula { range }))
    }
}

pub struct WilliamsRFormula {
    range: Range,
}

impl Formula for WilliamsRFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        let (close, high, low) = self.range.at(index);
        let width = high - low;
        if width == 0.0 {
            return -50.0;
        }
        (high - close) / width * -100.0
    }

    fn unstable_bars(&self) -> usize {
        self.range.period
    }
}

pub type WilliamsR = Cached<WilliamsRFormula>;

impl WilliamsR {
    pub fn new(series: Arc<BarSeries>, period: usize) -> Result<Self, TaError> {
        let range = Range::new(&series, period)?;
        Ok(Cached::from_formula(series, WilliamsRFormula { range }))
    }
}
