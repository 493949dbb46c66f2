//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper: Middle + (k × deviation)
//! - Lower: Middle - (k × deviation)
//!
//! The deviation is usually the population standard deviation over the same
//! window. Default parameters: period=20, k=2.0

use std::sync::Arc;

use crate::domain::error::TaError;
use crate::domain::indicator::sma::Sma;
use crate::domain::indicator::stddev::StdDev;
use crate::domain::indicator::{Cached, Formula, Indicator, NumIndicator, same_series};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_K: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Upper,
    Lower,
}

pub struct BandFormula {
    middle: NumIndicator,
    deviation: NumIndicator,
    k: f64,
    band: Band,
}

impl Formula for BandFormula {
    type Output = f64;

    fn calculate(&self, index: usize, _cached: &Cached<Self>) -> f64 {
        let offset = self.deviation.value(index) * self.k;
        match self.band {
            Band::Upper => self.middle.value(index) + offset,
            Band::Lower => self.middle.value(index) - offset,
        }
    }

    fn unstable_bars(&self) -> usize {
        self.middle
            .unstable_bars()
            .max(self.deviation.unstable_bars())
    }
}

/// Either band; which one is fixed at construction.
pub type BollingerBand = Cached<BandFormula>;

fn band(
    middle: NumIndicator,
    deviation: NumIndicator,
    k: f64,
    band: Band,
) -> Result<BollingerBand, TaError> {
    if k.is_nan() || k < 0.0 {
        return Err(TaError::invalid("k", format!("must be >= 0, got {k}")));
    }
    same_series(&middle, &deviation)?;
    let series = middle.series().clone();
    Ok(Cached::from_formula(
        series,
        BandFormula {
            middle,
            deviation,
            k,
            band,
        },
    ))
}

impl BollingerBand {
    pub fn upper(middle: NumIndicator, deviation: NumIndicator, k: f64) -> Result<Self, TaError> {
        band(middle, deviation, k, Band::Upper)
    }

    pub fn lower(middle: NumIndicator, deviation: NumIndicator, k: f64) -> Result<Self, TaError> {
        band(middle, deviation, k, Band::Lower)
    }

    pub fn k(&self) -> f64 {
        self.formula().k
    }
}

/// Middle, upper and lower bands over one input, sharing the SMA.
pub struct BollingerBands {
    pub middle: Arc<Sma>,
    pub upper: Arc<BollingerBand>,
    pub lower: Arc<BollingerBand>,
}

impl BollingerBands {
    pub fn new(input: NumIndicator, period: usize, k: f64) -> Result<Self, TaError> {
        let middle = Arc::new(Sma::new(input.clone(), period)?);
        let deviation: NumIndicator = Arc::new(StdDev::new(input, period)?);
        let upper = BollingerBand::upper(middle.clone(), deviation.clone(), k)?;
        let lower = BollingerBand::lower(middle.clone(), deviation, k)?;
        Ok(Self {
            middle,
            upper: Arc::new(upper),
            lower: Arc::new(lower),
        })
    }
}
