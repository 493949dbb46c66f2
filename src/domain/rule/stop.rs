//! Stop rules relative to the open position's entry net price.
//!
//! Thresholds are percentages: a 5% stop loss on a long entered at 100
//! triggers at or below 95. Without a record or without an open position the
//! rules are never satisfied.

use crate::domain::error::TaError;
use crate::domain::indicator::{Indicator, NumIndicator};
use crate::domain::rule::{Rule, trace_satisfied};
use crate::domain::trading_record::TradingRecord;

fn require_percentage(name: &'static str, pct: f64) -> Result<(), TaError> {
    if !pct.is_finite() || pct < 0.0 {
        return Err(TaError::invalid(name, format!("must be a percentage >= 0, got {pct}")));
    }
    Ok(())
}

/// (entry net price, current price, is long) for the open position.
fn open_position_prices(
    price: &NumIndicator,
    index: usize,
    record: Option<&TradingRecord>,
) -> Option<(f64, f64, bool)> {
    let position = record?.current_position();
    if !position.is_opened() {
        return None;
    }
    let entry = position.entry()?;
    Some((entry.net_price(), price.value(index), entry.is_buy()))
}

pub struct StopLossRule {
    price: NumIndicator,
    loss_pct: f64,
}

impl StopLossRule {
    pub fn new(price: NumIndicator, loss_pct: f64) -> Result<Self, TaError> {
        require_percentage("loss_pct", loss_pct)?;
        Ok(Self { price, loss_pct })
    }
}

impl Rule for StopLossRule {
    fn is_satisfied(&self, index: usize, record: Option<&TradingRecord>) -> bool {
        let satisfied = match open_position_prices(&self.price, index, record) {
            Some((entry, current, true)) => current <= entry * (100.0 - self.loss_pct) / 100.0,
            Some((entry, current, false)) => current >= entry * (100.0 + self.loss_pct) / 100.0,
            None => false,
        };
        trace_satisfied("StopLossRule", index, satisfied);
        satisfied
    }
}

pub struct StopGainRule {
    price: NumIndicator,
    gain_pct: f64,
}

impl StopGainRule {
    pub fn new(price: NumIndicator, gain_pct: f64) -> Result<Self, TaError> {
        require_percentage("gain_pct", gain_pct)?;
        Ok(Self { price, gain_pct })
    }
}

impl Rule for StopGainRule {
    fn is_satisfied(&self, index: usize, record: Option<&TradingRecord>) -> bool {
        let satisfied = match open_position_prices(&self.price, index, record) {
            Some((entry, current, true)) => current >= entry * (100.0 + self.gain_pct) / 100.0,
            Some((entry, current, false)) => current <= entry * (100.0 - self.gain_pct) / 100.0,
            None => false,
        };
        trace_satisfied("StopGainRule", index, satisfied);
        satisfied
    }
}
