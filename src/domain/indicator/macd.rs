//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9

use std::sync::Arc;

use crate::domain::error::{TaError, require_period};
use crate::domain::indicator::ema::Ema;
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub struct MacdFormula {
    fast: Ema,
    slow: Ema,
}

impl Formula for MacdFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        self.fast.value(index) - self.slow.value(index)
    }

    fn unstable_bars(&self) -> usize {
        self.fast.unstable_bars().max(self.slow.unstable_bars())
    }
}

pub type Macd = Cached<MacdFormula>;

impl Macd {
    pub fn new(input: NumIndicator, fast: usize, slow: usize) -> Result<Self, TaError> {
        require_period("fast", fast)?;
        require_period("slow", slow)?;
        if fast > slow {
            return Err(TaError::invalid(
                "fast",
                format!("short period {fast} exceeds long period {slow}"),
            ));
        }
        let series = input.series().clone();
        Ok(Cached::from_formula(
            series,
            MacdFormula {
                fast: Ema::new(input.clone(), fast)?,
                slow: Ema::new(input, slow)?,
            },
        ))
    }

    pub fn with_defaults(input: NumIndicator) -> Result<Self, TaError> {
        Self::new(input, DEFAULT_FAST, DEFAULT_SLOW)
    }

    pub fn fast_ema(&self) -> &Ema {
        &self.formula().fast
    }

    pub fn slow_ema(&self) -> &Ema {
        &self.formula().slow
    }
}

/// Signal line: EMA of the MACD line.
pub fn signal_line(macd: Arc<Macd>, period: usize) -> Result<Ema, TaError> {
    Ema::new(macd, period)
}

pub struct MacdHistogramFormula {
    macd: NumIndicator,
    signal: Ema,
}

impl Formula for MacdHistogramFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        self.macd.value(index) - self.signal.value(index)
    }

    fn unstable_bars(&self) -> usize {
        self.macd.unstable_bars().max(self.signal.unstable_bars())
    }
}

pub type MacdHistogram = Cached<MacdHistogramFormula>;

impl MacdHistogram {
    pub fn new(macd: Arc<Macd>, signal_period: usize) -> Result<Self, TaError> {
        let series = macd.series().clone();
        let macd: NumIndicator = macd;
        let signal = Ema::new(macd.clone(), signal_period)?;
        Ok(Cached::from_formula(
            series,
            MacdHistogramFormula { macd, signal },
        ))
    }
}
