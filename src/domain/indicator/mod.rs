//! Technical indicator engine.
//!
//! An indicator is a total function from a bar index to a value, computed
//! lazily and memoized. The pieces:
//! - [`Indicator`]: the read interface every indicator implements
//! - [`Cached`] / [`Formula`]: the memoizing engine concrete indicators plug into
//! - `IndicatorType`: indicator identity + parameters (serves as HashMap key)
//!
//! Indicators are not thread-safe to *fill* concurrently in any meaningful
//! order; the caches are behind locks so a fully assembled strategy can still
//! be shared between threads.

pub mod atr;
pub mod bollinger;
pub mod cache;
pub mod cci;
pub mod cross;
pub mod ema;
pub mod helpers;
pub mod hma;
pub mod macd;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod stochastic;
pub mod vwap;
pub mod wma;

use std::fmt;
use std::sync::Arc;

use crate::domain::error::TaError;
use crate::domain::series::BarSeries;

pub use cache::{Cached, Formula};

pub trait Indicator: Send + Sync {
    type Output: Clone + Send + Sync;

    /// Value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is past the end of the series.
    fn value(&self, index: usize) -> Self::Output;

    /// Number of leading bars whose values may be unreliable or NaN.
    fn unstable_bars(&self) -> usize;

    fn series(&self) -> &Arc<BarSeries>;

    fn is_stable(&self) -> bool {
        self.series().bar_count() >= self.unstable_bars()
    }

    fn try_value(&self, index: usize) -> Result<Self::Output, TaError> {
        self.series().check_index(index)?;
        Ok(self.value(index))
    }

    /// All values from the first to the last bar of the series.
    fn values(&self) -> Vec<Self::Output> {
        let series = self.series();
        if series.is_empty() {
            return Vec::new();
        }
        (series.begin_index()..=series.end_index())
            .map(|i| self.value(i))
            .collect()
    }
}

pub type NumIndicator = Arc<dyn Indicator<Output = f64>>;
pub type BoolIndicator = Arc<dyn Indicator<Output = bool>>;

pub(crate) fn same_series(a: &NumIndicator, b: &NumIndicator) -> Result<(), TaError> {
    if Arc::ptr_eq(a.series(), b.series()) {
        Ok(())
    } else {
        Err(TaError::invalid(
            "indicator",
            "operands must be built on the same bar series",
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Wma(usize),
    Hma(usize),
    Mma(usize),
    Rsi(usize),
    Roc(usize),
    Atr(usize),
    TrueRange,
    Stddev(usize),
    Cci(usize),
    Obv,
    Vwap(usize),
    Highest(usize),
    Lowest(usize),
    StochasticK(usize),
    WilliamsR(usize),
    Macd {
        fast: usize,
        slow: usize,
    },
    MacdSignal {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    MacdHistogram {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    BollingerUpper {
        period: usize,
        k_x100: u32,
    },
    BollingerMiddle(usize),
    BollingerLower {
        period: usize,
        k_x100: u32,
    },
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(n) => write!(f, "SMA({})", n),
            IndicatorType::Ema(n) => write!(f, "EMA({})", n),
            IndicatorType::Wma(n) => write!(f, "WMA({})", n),
            IndicatorType::Hma(n) => write!(f, "HMA({})", n),
            IndicatorType::Mma(n) => write!(f, "MMA({})", n),
            IndicatorType::Rsi(n) => write!(f, "RSI({})", n),
            IndicatorType::Roc(n) => write!(f, "ROC({})", n),
            IndicatorType::Atr(n) => write!(f, "ATR({})", n),
            IndicatorType::TrueRange => write!(f, "TR"),
            IndicatorType::Stddev(n) => write!(f, "STDDEV({})", n),
            IndicatorType::Cci(n) => write!(f, "CCI({})", n),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::Vwap(n) => write!(f, "VWAP({})", n),
            IndicatorType::Highest(n) => write!(f, "HIGHEST({})", n),
            IndicatorType::Lowest(n) => write!(f, "LOWEST({})", n),
            IndicatorType::StochasticK(n) => write!(f, "STOCHASTIC_K({})", n),
            IndicatorType::WilliamsR(n) => write!(f, "WILLIAMS_R({})", n),
            IndicatorType::Macd { fast, slow } => write!(f, "MACD({},{})", fast, slow),
            IndicatorType::MacdSignal { fast, slow, signal } => {
                write!(f, "MACD_SIGNAL({},{},{})", fast, slow, signal)
            }
            IndicatorType::MacdHistogram { fast, slow, signal } => {
                write!(f, "MACD_HISTOGRAM({},{},{})", fast, slow, signal)
            }
            IndicatorType::BollingerUpper { period, k_x100 } => {
                write!(f, "BOLLINGER_UPPER({},{})", period, *k_x100 as f64 / 100.0)
            }
            IndicatorType::BollingerMiddle(period) => write!(f, "BOLLINGER_MIDDLE({})", period),
            IndicatorType::BollingerLower { period, k_x100 } => {
                write!(f, "BOLLINGER_LOWER({},{})", period, *k_x100 as f64 / 100.0)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
        assert_eq!(IndicatorType::Hma(9).to_string(), "HMA(9)");
        assert_eq!(
            IndicatorType::MacdSignal {
                fast: 12,
                slow: 26,
                signal: 9
            }
            .to_string(),
            "MACD_SIGNAL(12,26,9)"
        );
        assert_eq!(
            IndicatorType::BollingerUpper {
                period: 20,
                k_x100: 200
            }
            .to_string(),
            "BOLLINGER_UPPER(20,2)"
        );
        assert_eq!(IndicatorType::Obv.to_string(), "OBV");
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Sma(20), "sma20");
        map.insert(IndicatorType::Macd { fast: 12, slow: 26 }, "macd");

        assert_eq!(map.get(&IndicatorType::Sma(20)), Some(&"sma20"));
        assert_eq!(map.get(&IndicatorType::Sma(50)), None);
        assert_eq!(
            map.get(&IndicatorType::Macd { fast: 12, slow: 26 }),
            Some(&"macd")
        );
    }

    #[test]
    fn try_value_checks_range() {
        let series = series_from_closes(&[1.0, 2.0]);
        let close = close(&series);
        assert_eq!(close.try_value(1).unwrap(), 2.0);
        assert!(matches!(
            close.try_value(2),
            Err(TaError::IndexOutOfRange {
                index: 2,
                bar_count: 2
            })
        ));
    }

    #[test]
    fn values_covers_whole_series() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        assert_eq!(close(&series).values(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn is_stable_compares_bar_count() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        let sma3 = sma::Sma::new(close(&series), 3).unwrap();
        let sma4 = sma::Sma::new(close(&series), 4).unwrap();
        assert!(sma3.is_stable());
        assert!(!sma4.is_stable());
    }

    #[test]
    fn same_series_rejects_foreign_operands() {
        let a = close(&series_from_closes(&[1.0]));
        let b = close(&series_from_closes(&[1.0]));
        assert!(same_series(&a, &a.clone()).is_ok());
        assert!(same_series(&a, &b).is_err());
    }
}
