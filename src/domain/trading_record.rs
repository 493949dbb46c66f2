//! Trading record: the closed positions of one run plus the current one.
//!
//! Not thread-safe to mutate; each backtest owns its own record.

use std::sync::Arc;

use tracing::debug;

use crate::domain::cost::{CostModel, ZeroCost};
use crate::domain::error::TaError;
use crate::domain::position::{Position, PositionState};
use crate::domain::trade::{Trade, TradeType};

#[derive(Debug, Clone)]
pub struct TradingRecord {
    starting_type: TradeType,
    positions: Vec<Position>,
    trades: Vec<Trade>,
    current: Position,
    transaction_cost: Arc<dyn CostModel>,
    holding_cost: Arc<dyn CostModel>,
}

impl Default for TradingRecord {
    fn default() -> Self {
        Self::new(TradeType::Buy)
    }
}

impl TradingRecord {
    /// Cost-free record whose positions open with `starting_type`.
    pub fn new(starting_type: TradeType) -> Self {
        Self::with_cost_models(starting_type, Arc::new(ZeroCost), Arc::new(ZeroCost))
    }

    pub fn with_cost_models(
        starting_type: TradeType,
        transaction_cost: Arc<dyn CostModel>,
        holding_cost: Arc<dyn CostModel>,
    ) -> Self {
        let current = Position::new(
            starting_type,
            Arc::clone(&transaction_cost),
            Arc::clone(&holding_cost),
        );
        TradingRecord {
            starting_type,
            positions: Vec::new(),
            trades: Vec::new(),
            current,
            transaction_cost,
            holding_cost,
        }
    }

    fn check_monotonic(&self, index: usize) -> Result<(), TaError> {
        match self.trades.last() {
            Some(last) if index < last.index() => Err(TaError::NonMonotonicIndex {
                index,
                last: last.index(),
            }),
            _ => Ok(()),
        }
    }

    /// Open the current position. Fails if one is already open.
    pub fn enter(&mut self, index: usize, price: f64, amount: f64) -> Result<(), TaError> {
        if self.current.is_opened() {
            return Err(TaError::PositionAlreadyOpen { index });
        }
        self.operate(index, price, amount)
    }

    /// Close the current position. Fails if none is open.
    pub fn exit(&mut self, index: usize, price: f64, amount: f64) -> Result<(), TaError> {
        if !self.current.is_opened() {
            return Err(TaError::NoOpenPosition { index });
        }
        self.operate(index, price, amount)
    }

    /// Enter when flat, exit when a position is open.
    pub fn operate(&mut self, index: usize, price: f64, amount: f64) -> Result<(), TaError> {
        self.check_monotonic(index)?;
        let trade = self.current.operate(index, price, amount)?.clone();
        debug!(
            index,
            trade_type = %trade.trade_type(),
            price,
            amount,
            cost = trade.cost(),
            "trade recorded"
        );
        self.trades.push(trade);

        if self.current.is_closed() {
            let fresh = Position::new(
                self.starting_type,
                Arc::clone(&self.transaction_cost),
                Arc::clone(&self.holding_cost),
            );
            let closed = std::mem::replace(&mut self.current, fresh);
            debug!(
                position = self.positions.len(),
                profit = closed.profit(),
                "position closed"
            );
            self.positions.push(closed);
        }
        Ok(())
    }

    pub fn starting_type(&self) -> TradeType {
        self.starting_type
    }

    pub fn current_position(&self) -> &Position {
        &self.current
    }

    pub fn current_state(&self) -> PositionState {
        self.current.state()
    }

    /// True when no position is open.
    pub fn is_closed(&self) -> bool {
        !self.current.is_opened()
    }

    /// Closed positions, oldest first.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn last_trade(&self) -> Option<&Trade> {
        self.trades.last()
    }

    pub fn last_trade_of(&self, trade_type: TradeType) -> Option<&Trade> {
        self.trades
            .iter()
            .rev()
            .find(|t| t.trade_type() == trade_type)
    }

    pub fn last_entry(&self) -> Option<&Trade> {
        self.last_trade_of(self.starting_type)
    }

    pub fn last_exit(&self) -> Option<&Trade> {
        self.last_trade_of(self.starting_type.complement())
    }

    pub fn transaction_cost_model(&self) -> &Arc<dyn CostModel> {
        &self.transaction_cost
    }

    pub fn holding_cost_model(&self) -> &Arc<dyn CostModel> {
        &self.holding_cost
    }

    /// Sum of closed positions' net profit.
    pub fn total_profit(&self) -> f64 {
        self.positions.iter().map(Position::profit).sum()
    }
}
