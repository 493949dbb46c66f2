//! Leaf and helper indicators: raw bar fields, constants, true range,
//! gain/loss, and rolling highest/lowest.

use std::fmt;
use std::sync::Arc;

use crate::domain::error::{TaError, require_period};
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};
use crate::domain::ohlcv::Bar;
use crate::domain::series::BarSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
    Amount,
    Typical,
    Median,
}

impl PriceField {
    pub fn of(self, bar: &Bar) -> f64 {
        match self {
            PriceField::Open => bar.open,
            PriceField::High => bar.high,
            PriceField::Low => bar.low,
            PriceField::Close => bar.close,
            PriceField::Volume => bar.volume,
            PriceField::Amount => bar.amount,
            PriceField::Typical => bar.typical_price(),
            PriceField::Median => bar.median_price(),
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::Volume => "volume",
            PriceField::Amount => "amount",
            PriceField::Typical => "typical",
            PriceField::Median => "median",
        };
        f.write_str(name)
    }
}

/// Reads one field straight off the bar. Not cached: the lookup is the value.
pub struct PriceIndicator {
    series: Arc<BarSeries>,
    field: PriceField,
}

impl PriceIndicator {
    pub fn new(series: Arc<BarSeries>, field: PriceField) -> Self {
        Self { series, field }
    }

    pub fn field(&self) -> PriceField {
        self.field
    }
}

impl Indicator for PriceIndicator {
    type Output = f64;

    fn value(&self, index: usize) -> f64 {
        self.field.of(self.series.bar(index))
    }

    fn unstable_bars(&self) -> usize {
        0
    }

    fn series(&self) -> &Arc<BarSeries> {
        &self.series
    }
}

pub struct ConstantIndicator {
    series: Arc<BarSeries>,
    value: f64,
}

impl ConstantIndicator {
    pub fn new(series: Arc<BarSeries>, value: f64) -> Self {
        Self { series, value }
    }
}

impl Indicator for ConstantIndicator {
    type Output = f64;

    fn value(&self, index: usize) -> f64 {
        self.series.bar(index);
        self.value
    }

    fn unstable_bars(&self) -> usize {
        0
    }

    fn series(&self) -> &Arc<BarSeries> {
        &self.series
    }
}

pub struct TrueRangeFormula;

impl Formula for TrueRangeFormula {
    type Output = f64;

    fn calculate(&self, index: usize, cached: &Cached<Self>) -> f64 {
        let series = cached.series();
        let bar = series.bar(index);
        if index == 0 {
            return (bar.high - bar.low).abs();
        }
        bar.true_range(series.bar(index - 1).close)
    }

    fn unstable_bars(&self) -> usize {
        1
    }
}

pub type TrueRange = Cached<TrueRangeFormula>;

impl TrueRange {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Cached::from_formula(series, TrueRangeFormula)
    }
}

/// Positive change from the previous bar, else 0.
pub struct GainFormula {
    input: NumIndicator,
}

impl Formula for GainFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        if index == 0 {
            return 0.0;
        }
        let change = self.input.value(index) - self.input.value(index - 1);
        if change > 0.0 { change } else { 0.0 }
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + 1
    }
}

pub type Gain = Cached<GainFormula>;

impl Gain {
    pub fn new(input: NumIndicator) -> Self {
        let series = input.series().clone();
        Cached::from_formula(series, GainFormula { input })
    }
}

/// Magnitude of a negative change from the previous bar, else 0.
pub struct LossFormula {
    input: NumIndicator,
}

impl Formula for LossFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        if index == 0 {
            return 0.0;
        }
        let change = self.input.value(index) - self.input.value(index - 1);
        if change < 0.0 { -change } else { 0.0 }
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + 1
    }
}

pub type Loss = Cached<LossFormula>;

impl Loss {
    pub fn new(input: NumIndicator) -> Self {
        let series = input.series().clone();
        Cached::from_formula(series, LossFormula { input })
    }
}

/// Rolling extreme over `period` bars ending at `index`.
///
/// A NaN at the end of the window shrinks the window by one bar and moves the
/// end back one bar, repeatedly, until a number is found or the window is a
/// single bar. NaNs inside the window are skipped.
fn window_extreme(
    input: &NumIndicator,
    index: usize,
    period: usize,
    replaces: fn(current: f64, candidate: f64) -> bool,
) -> f64 {
    let mut end = index;
    let mut window = period;
    while input.value(end).is_nan() && window > 1 && end > 0 {
        end -= 1;
        window -= 1;
    }

    let start = (end + 1).saturating_sub(window);
    let mut extreme = input.value(end);
    for i in (start..end).rev() {
        let candidate = input.value(i);
        if replaces(extreme, candidate) {
            extreme = candidate;
        }
    }
    extreme
}

pub struct HighestFormula {
    input: NumIndicator,
    period: usize,
}

impl Formula for HighestFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        window_extreme(&self.input, index, self.period, |current, candidate| {
            current < candidate
        })
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + self.period
    }
}

pub type Highest = Cached<HighestFormula>;

impl Highest {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        require_period("period", period)?;
        let series = input.series().clone();
        Ok(Cached::from_formula(series, HighestFormula { input, period }))
    }
}

pub struct LowestFormula {
    input: NumIndicator,
    period: usize,
}

impl Formula for LowestFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        window_extreme(&self.input, index, self.period, |current, candidate| {
            current > candidate
        })
    }

    fn unstable_bars(&self) -> usize {
        self.input.unstable_bars() + self.period
    }
}

pub type Lowest = Cached<LowestFormula>;

impl Lowest {
    pub fn new(input: NumIndicator, period: usize) -> Result<Self, TaError> {
        require_period("period", period)?;
        let series = input.series().clone();
        Ok(Cached::from_formula(series, LowestFormula { input, period }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::*;

    #[test]
    fn price_fields() {
        let series = series_from_hlc(&[(12.0, 8.0, 10.0)]);
        let typical = PriceIndicator::new(series.clone(), PriceField::Typical);
        let median = PriceIndicator::new(series.clone(), PriceField::Median);
        let high = PriceIndicator::new(series, PriceField::High);
        assert_close(typical.value(0), 10.0);
        assert_close(median.value(0), 10.0);
        assert_close(high.value(0), 12.0);
        assert_eq!(PriceField::Typical.to_string(), "typical");
    }

    #[test]
    fn constant_is_flat() {
        let series = series_from_closes(&[1.0, 2.0]);
        let c = ConstantIndicator::new(series, 42.0);
        assert_eq!(c.values(), vec![42.0, 42.0]);
        assert_eq!(c.unstable_bars(), 0);
    }

    #[test]
    fn true_range_first_bar_is_high_minus_low() {
        let series = series_from_hlc(&[(12.0, 8.0, 10.0), (11.0, 9.0, 10.0), (20.0, 15.0, 18.0)]);
        let tr = TrueRange::new(series);
        assert_close(tr.value(0), 4.0);
        assert_close(tr.value(1), 2.0);
        // gap up: |20 - 10| beats 20 - 15
        assert_close(tr.value(2), 10.0);
        assert_eq!(tr.unstable_bars(), 1);
    }

    #[test]
    fn gain_and_loss() {
        let series = series_from_closes(&[10.0, 12.0, 11.0, 11.0]);
        let gain = Gain::new(close(&series));
        let loss = Loss::new(close(&series));
        assert_eq!(gain.values(), vec![0.0, 2.0, 0.0, 0.0]);
        assert_eq!(loss.values(), vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn highest_and_lowest_partial_windows() {
        let series = series_from_closes(&[3.0, 1.0, 4.0, 1.0, 5.0, 2.0]);
        let highest = Highest::new(close(&series), 3).unwrap();
        let lowest = Lowest::new(close(&series), 3).unwrap();
        assert_eq!(highest.values(), vec![3.0, 3.0, 4.0, 4.0, 5.0, 5.0]);
        assert_eq!(lowest.values(), vec![3.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(highest.unstable_bars(), 3);
    }

    #[test]
    fn highest_shrinks_window_on_nan() {
        let series = series_from_closes(&[5.0, 1.0, 2.0, f64::NAN]);
        let highest = Highest::new(close(&series), 3).unwrap();
        // window [1, 2, NaN] shrinks to [1, 2]
        assert_close(highest.value(3), 2.0);
    }

    #[test]
    fn highest_window_floor_is_one_bar() {
        let series = series_from_closes(&[f64::NAN, f64::NAN]);
        let highest = Highest::new(close(&series), 1).unwrap();
        assert!(highest.value(1).is_nan());
        let highest = Highest::new(close(&series), 5).unwrap();
        assert!(highest.value(1).is_nan());
    }

    #[test]
    fn zero_period_rejected() {
        let series = series_from_closes(&[1.0]);
        assert!(Highest::new(close(&series), 0).is_err());
        assert!(Lowest::new(close(&series), 0).is_err());
    }
}
