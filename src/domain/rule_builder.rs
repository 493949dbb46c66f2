//! Turns parsed rules into shared rule objects over one bar series.
//!
//! Indicators are resolved through an [`IndicatorRegistry`] keyed by
//! `IndicatorType`, so every reference to, say, `SMA(20)` in the entry and
//! exit rules reads the same cache.
//!
//! - Price-based indicators read close prices
//! - `HIGHEST` reads highs, `LOWEST` reads lows
//! - `BOLLINGER_MIDDLE(n)` is `SMA(n)`; the outer bands reuse `SMA(n)` and `STDDEV(n)`

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::error::TaError;
use crate::domain::indicator::atr::Atr;
use crate::domain::indicator::bollinger::BollingerBand;
use crate::domain::indicator::cci::Cci;
use crate::domain::indicator::ema::{Ema, Mma};
use crate::domain::indicator::helpers::{
    ConstantIndicator, Highest, Lowest, PriceField, PriceIndicator, TrueRange,
};
use crate::domain::indicator::hma::Hma;
use crate::domain::indicator::macd::{Macd, MacdHistogram, signal_line};
use crate::domain::indicator::obv::Obv;
use crate::domain::indicator::roc::Roc;
use crate::domain::indicator::rsi::Rsi;
use crate::domain::indicator::sma::Sma;
use crate::domain::indicator::stddev::StdDev;
use crate::domain::indicator::stochastic::{StochasticK, WilliamsR};
use crate::domain::indicator::vwap::Vwap;
use crate::domain::indicator::wma::Wma;
use crate::domain::indicator::{Indicator, IndicatorType, NumIndicator};
use crate::domain::rule::{
    BooleanRule, CrossedDownIndicatorRule, CrossedUpIndicatorRule, IsFallingRule, IsRisingRule,
    OverIndicatorRule, RuleExt, SharedRule, StopGainRule, StopLossRule, UnderIndicatorRule,
};
use crate::domain::rule_spec::{Operand, RuleSpec};
use crate::domain::series::BarSeries;
use crate::domain::strategy::Strategy;

fn invalid_rule(context: impl fmt::Display, err: TaError) -> TaError {
    TaError::RuleInvalid {
        reason: format!("{context}: {err}"),
    }
}

pub struct IndicatorRegistry {
    series: Arc<BarSeries>,
    prices: HashMap<PriceField, NumIndicator>,
    indicators: HashMap<IndicatorType, NumIndicator>,
    macds: HashMap<(usize, usize), Arc<Macd>>,
}

impl IndicatorRegistry {
    pub fn new(series: Arc<BarSeries>) -> Self {
        Self {
            series,
            prices: HashMap::new(),
            indicators: HashMap::new(),
            macds: HashMap::new(),
        }
    }

    pub fn series(&self) -> &Arc<BarSeries> {
        &self.series
    }

    /// Number of distinct indicators built so far.
    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    pub fn price(&mut self, field: PriceField) -> NumIndicator {
        let series = &self.series;
        self.prices
            .entry(field)
            .or_insert_with(|| Arc::new(PriceIndicator::new(series.clone(), field)))
            .clone()
    }

    fn macd(&mut self, fast: usize, slow: usize) -> Result<Arc<Macd>, TaError> {
        if let Some(macd) = self.macds.get(&(fast, slow)) {
            return Ok(macd.clone());
        }
        let macd = Arc::new(Macd::new(self.price(PriceField::Close), fast, slow)?);
        self.macds.insert((fast, slow), macd.clone());
        Ok(macd)
    }

    /// The shared instance for `indicator`, built on first use.
    pub fn get(&mut self, indicator: &IndicatorType) -> Result<NumIndicator, TaError> {
        if let Some(found) = self.indicators.get(indicator) {
            return Ok(found.clone());
        }
        let built = self
            .build(indicator)
            .map_err(|err| invalid_rule(indicator, err))?;
        self.indicators.insert(indicator.clone(), built.clone());
        Ok(built)
    }

    fn build(&mut self, indicator: &IndicatorType) -> Result<NumIndicator, TaError> {
        let series = self.series.clone();
        let close = self.price(PriceField::Close);
        let built: NumIndicator = match *indicator {
            IndicatorType::Sma(n) => Arc::new(Sma::new(close, n)?),
            IndicatorType::BollingerMiddle(n) => self.get(&IndicatorType::Sma(n))?,
            IndicatorType::Ema(n) => Arc::new(Ema::new(close, n)?),
            IndicatorType::Wma(n) => Arc::new(Wma::new(close, n)?),
            IndicatorType::Hma(n) => Arc::new(Hma::new(close, n)?),
            IndicatorType::Mma(n) => Arc::new(Mma::new(close, n)?),
            IndicatorType::Rsi(n) => Arc::new(Rsi::new(close, n)?),
            IndicatorType::Roc(n) => Arc::new(Roc::new(close, n)?),
            IndicatorType::Stddev(n) => Arc::new(StdDev::new(close, n)?),
            IndicatorType::Atr(n) => Arc::new(Atr::new(series, n)?),
            IndicatorType::TrueRange => Arc::new(TrueRange::new(series)),
            IndicatorType::Cci(n) => Arc::new(Cci::new(series, n)?),
            IndicatorType::Obv => Arc::new(Obv::new(series)),
            IndicatorType::Vwap(n) => Arc::new(Vwap::new(series, n)?),
            IndicatorType::StochasticK(n) => Arc::new(StochasticK::new(series, n)?),
            IndicatorType::WilliamsR(n) => Arc::new(WilliamsR::new(series, n)?),
            IndicatorType::Highest(n) => Arc::new(Highest::new(self.price(PriceField::High), n)?),
            IndicatorType::Lowest(n) => Arc::new(Lowest::new(self.price(PriceField::Low), n)?),
            IndicatorType::Macd { fast, slow } => self.macd(fast, slow)?,
            IndicatorType::MacdSignal { fast, slow, signal } => {
                Arc::new(signal_line(self.macd(fast, slow)?, signal)?)
            }
            IndicatorType::MacdHistogram { fast, slow, signal } => {
                Arc::new(MacdHistogram::new(self.macd(fast, slow)?, signal)?)
            }
            IndicatorType::BollingerUpper { period, k_x100 } => {
                let middle = self.get(&IndicatorType::Sma(period))?;
                let deviation = self.get(&IndicatorType::Stddev(period))?;
                Arc::new(BollingerBand::upper(middle, deviation, k_x100 as f64 / 100.0)?)
            }
            IndicatorType::BollingerLower { period, k_x100 } => {
                let middle = self.get(&IndicatorType::Sma(period))?;
                let deviation = self.get(&IndicatorType::Stddev(period))?;
                Arc::new(BollingerBand::lower(middle, deviation, k_x100 as f64 / 100.0)?)
            }
        };
        Ok(built)
    }

    pub fn operand(&mut self, operand: &Operand) -> Result<NumIndicator, TaError> {
        match operand {
            Operand::Price(field) => Ok(self.price(*field)),
            Operand::Constant(value) => Ok(Arc::new(ConstantIndicator::new(
                self.series.clone(),
                *value,
            ))),
            Operand::Indicator(indicator) => self.get(indicator),
        }
    }
}

/// Build a shared rule for `spec`, resolving indicators through `registry`.
pub fn build_rule(spec: &RuleSpec, registry: &mut IndicatorRegistry) -> Result<SharedRule, TaError> {
    let rule: SharedRule = match spec {
        RuleSpec::Above { left, right } => {
            let (left, right) = (registry.operand(left)?, registry.operand(right)?);
            Arc::new(OverIndicatorRule::new(left, right).map_err(|e| invalid_rule(spec, e))?)
        }
        RuleSpec::Below { left, right } => {
            let (left, right) = (registry.operand(left)?, registry.operand(right)?);
            Arc::new(UnderIndicatorRule::new(left, right).map_err(|e| invalid_rule(spec, e))?)
        }
        RuleSpec::CrossAbove { left, right } => {
            let (left, right) = (registry.operand(left)?, registry.operand(right)?);
            Arc::new(CrossedUpIndicatorRule::new(left, right).map_err(|e| invalid_rule(spec, e))?)
        }
        RuleSpec::CrossBelow { left, right } => {
            let (left, right) = (registry.operand(left)?, registry.operand(right)?);
            Arc::new(
                CrossedDownIndicatorRule::new(left, right).map_err(|e| invalid_rule(spec, e))?,
            )
        }
        RuleSpec::And(rules) => fold_rules(rules, registry, |a, b| a.and(b))?,
        RuleSpec::Or(rules) => fold_rules(rules, registry, |a, b| a.or(b))?,
        RuleSpec::Xor(first, second) => {
            build_rule(first, registry)?.xor(&build_rule(second, registry)?)
        }
        RuleSpec::Not(inner) => build_rule(inner, registry)?.negation(),
        RuleSpec::StopLoss(pct) => {
            let close = registry.price(PriceField::Close);
            Arc::new(StopLossRule::new(close, *pct).map_err(|e| invalid_rule(spec, e))?)
        }
        RuleSpec::StopGain(pct) => {
            let close = registry.price(PriceField::Close);
            Arc::new(StopGainRule::new(close, *pct).map_err(|e| invalid_rule(spec, e))?)
        }
        RuleSpec::IsRising {
            operand,
            bar_count,
            min_strength,
        } => {
            let indicator = registry.operand(operand)?;
            let strength = min_strength.unwrap_or(1.0);
            Arc::new(
                IsRisingRule::new(indicator, *bar_count, strength)
                    .map_err(|e| invalid_rule(spec, e))?,
            )
        }
        RuleSpec::IsFalling {
            operand,
            bar_count,
            min_strength,
        } => {
            let indicator = registry.operand(operand)?;
            let strength = min_strength.unwrap_or(1.0);
            Arc::new(
                IsFallingRule::new(indicator, *bar_count, strength)
                    .map_err(|e| invalid_rule(spec, e))?,
            )
        }
        RuleSpec::True => Arc::new(BooleanRule::TRUE),
        RuleSpec::False => Arc::new(BooleanRule::FALSE),
    };
    Ok(rule)
}

fn fold_rules(
    rules: &[RuleSpec],
    registry: &mut IndicatorRegistry,
    combine: impl Fn(&SharedRule, &SharedRule) -> SharedRule,
) -> Result<SharedRule, TaError> {
    let mut built = rules.iter().map(|rule| build_rule(rule, registry));
    let first = built.next().ok_or_else(|| TaError::RuleInvalid {
        reason: "composite rule without operands".to_string(),
    })??;
    built.try_fold(first, |acc, next| Ok(combine(&acc, &next?)))
}

/// Longest warm-up among the indicators `spec` references; 0 when none.
pub fn max_unstable_bars(spec: &RuleSpec, registry: &mut IndicatorRegistry) -> Result<usize, TaError> {
    let mut max = 0;
    for indicator in spec.indicators() {
        max = max.max(registry.get(indicator)?.unstable_bars());
    }
    Ok(max)
}

/// A named strategy from parsed entry and exit rules. Without an explicit
/// `unstable_bars` the strategy waits for the slowest referenced indicator.
pub fn build_strategy(
    name: &str,
    entry: &RuleSpec,
    exit: &RuleSpec,
    unstable_bars: Option<usize>,
    registry: &mut IndicatorRegistry,
) -> Result<Strategy, TaError> {
    let entry_rule = build_rule(entry, registry)?;
    let exit_rule = build_rule(exit, registry)?;
    let unstable_bars = match unstable_bars {
        Some(n) => n,
        None => max_unstable_bars(entry, registry)?.max(max_unstable_bars(exit, registry)?),
    };
    Ok(Strategy::new(name, entry_rule, exit_rule).with_unstable_bars(unstable_bars))
}
