//! Cost models applied to trades and positions.
//!
//! A transaction model prices a single trade; a holding model prices the time
//! a position stays open. Each model answers both questions and returns 0 for
//! the one it does not cover.

use std::fmt::Debug;

use crate::domain::error::TaError;
use crate::domain::position::Position;
use crate::domain::trade::TradeType;

pub trait CostModel: Debug + Send + Sync {
    /// Cost of trading `amount` units at `price`.
    fn transaction_cost(&self, price: f64, amount: f64) -> f64;

    /// Cost of holding `position` up to `current_index`.
    fn holding_cost(&self, position: &Position, current_index: usize) -> f64;
}

fn require_fee(name: &'static str, fee: f64) -> Result<(), TaError> {
    if fee.is_nan() || fee < 0.0 {
        return Err(TaError::invalid(name, format!("must be >= 0, got {fee}")));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ZeroCost;

impl CostModel for ZeroCost {
    fn transaction_cost(&self, _price: f64, _amount: f64) -> f64 {
        0.0
    }

    fn holding_cost(&self, _position: &Position, _current_index: usize) -> f64 {
        0.0
    }
}

/// Flat fee per trade regardless of size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTransactionCost {
    fee_per_trade: f64,
}

impl FixedTransactionCost {
    pub fn new(fee_per_trade: f64) -> Result<Self, TaError> {
        require_fee("fee_per_trade", fee_per_trade)?;
        Ok(Self { fee_per_trade })
    }
}

impl CostModel for FixedTransactionCost {
    fn transaction_cost(&self, _price: f64, _amount: f64) -> f64 {
        self.fee_per_trade
    }

    fn holding_cost(&self, _position: &Position, _current_index: usize) -> f64 {
        0.0
    }
}

/// Fee proportional to traded value: price * amount * ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTransactionCost {
    fee_ratio: f64,
}

impl LinearTransactionCost {
    pub fn new(fee_ratio: f64) -> Result<Self, TaError> {
        require_fee("fee_ratio", fee_ratio)?;
        Ok(Self { fee_ratio })
    }
}

impl CostModel for LinearTransactionCost {
    fn transaction_cost(&self, price: f64, amount: f64) -> f64 {
        price * amount * self.fee_ratio
    }

    fn holding_cost(&self, _position: &Position, _current_index: usize) -> f64 {
        0.0
    }
}

/// Borrowing fee charged on short positions for every bar they stay open:
/// entry value * fee_per_period * periods held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBorrowingCost {
    fee_per_period: f64,
}

impl LinearBorrowingCost {
    pub fn new(fee_per_period: f64) -> Result<Self, TaError> {
        require_fee("fee_per_period", fee_per_period)?;
        Ok(Self { fee_per_period })
    }
}

impl CostModel for LinearBorrowingCost {
    fn transaction_cost(&self, _price: f64, _amount: f64) -> f64 {
        0.0
    }

    fn holding_cost(&self, position: &Position, current_index: usize) -> f64 {
        let Some(entry) = position.entry() else {
            return 0.0;
        };
        if entry.trade_type() != TradeType::Sell {
            return 0.0;
        }
        let until = match position.exit() {
            Some(exit) => exit.index().min(current_index),
            None => current_index,
        };
        let periods = until.saturating_sub(entry.index());
        entry.value() * periods as f64 * self.fee_per_period
    }
}
