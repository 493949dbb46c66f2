//! Round-trip positions: an entry trade and, once closed, an exit trade.
//!
//! Lifecycle: New (no trades) -> Opened (entry set) -> Closed (exit set).
//! Direction comes from the starting trade type: Buy is long, Sell is short.

use std::fmt;
use std::sync::Arc;

use crate::domain::cost::{CostModel, ZeroCost};
use crate::domain::error::TaError;
use crate::domain::trade::{Trade, TradeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    New,
    Opened,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Position {
    starting_type: TradeType,
    entry: Option<Trade>,
    exit: Option<Trade>,
    transaction_cost: Arc<dyn CostModel>,
    holding_cost: Arc<dyn CostModel>,
}

impl Position {
    pub fn new(
        starting_type: TradeType,
        transaction_cost: Arc<dyn CostModel>,
        holding_cost: Arc<dyn CostModel>,
    ) -> Self {
        Position {
            starting_type,
            entry: None,
            exit: None,
            transaction_cost,
            holding_cost,
        }
    }

    /// A long position with no costs.
    pub fn long() -> Self {
        Self::new(TradeType::Buy, Arc::new(ZeroCost), Arc::new(ZeroCost))
    }

    /// A short position with no costs.
    pub fn short() -> Self {
        Self::new(TradeType::Sell, Arc::new(ZeroCost), Arc::new(ZeroCost))
    }

    /// Build a closed position from two existing trades.
    pub fn closed(
        entry: Trade,
        exit: Trade,
        transaction_cost: Arc<dyn CostModel>,
        holding_cost: Arc<dyn CostModel>,
    ) -> Result<Self, TaError> {
        if exit.trade_type() != entry.trade_type().complement() {
            return Err(TaError::invalid(
                "exit",
                format!(
                    "exit must be a {} to close a {} entry",
                    entry.trade_type().complement(),
                    entry.trade_type()
                ),
            ));
        }
        if exit.index() < entry.index() {
            return Err(TaError::NonMonotonicIndex {
                index: exit.index(),
                last: entry.index(),
            });
        }
        Ok(Position {
            starting_type: entry.trade_type(),
            entry: Some(entry),
            exit: Some(exit),
            transaction_cost,
            holding_cost,
        })
    }

    /// Open the position if new, close it if opened. Returns the new trade.
    pub fn operate(&mut self, index: usize, price: f64, amount: f64) -> Result<&Trade, TaError> {
        match self.state() {
            PositionState::New => {
                let trade = Trade::new(
                    index,
                    self.starting_type,
                    price,
                    amount,
                    self.transaction_cost.as_ref(),
                );
                Ok(self.entry.insert(trade))
            }
            PositionState::Opened => {
                let entry_index = self.entry.as_ref().map_or(0, Trade::index);
                if index < entry_index {
                    return Err(TaError::NonMonotonicIndex {
                        index,
                        last: entry_index,
                    });
                }
                let trade = Trade::new(
                    index,
                    self.starting_type.complement(),
                    price,
                    amount,
                    self.transaction_cost.as_ref(),
                );
                Ok(self.exit.insert(trade))
            }
            PositionState::Closed => Err(TaError::PositionClosed { index }),
        }
    }

    pub fn state(&self) -> PositionState {
        match (&self.entry, &self.exit) {
            (None, _) => PositionState::New,
            (Some(_), None) => PositionState::Opened,
            (Some(_), Some(_)) => PositionState::Closed,
        }
    }

    pub fn is_new(&self) -> bool {
        self.state() == PositionState::New
    }

    pub fn is_opened(&self) -> bool {
        self.state() == PositionState::Opened
    }

    pub fn is_closed(&self) -> bool {
        self.state() == PositionState::Closed
    }

    pub fn starting_type(&self) -> TradeType {
        self.starting_type
    }

    pub fn is_long(&self) -> bool {
        self.starting_type == TradeType::Buy
    }

    pub fn is_short(&self) -> bool {
        self.starting_type == TradeType::Sell
    }

    pub fn entry(&self) -> Option<&Trade> {
        self.entry.as_ref()
    }

    pub fn exit(&self) -> Option<&Trade> {
        self.exit.as_ref()
    }

    pub fn transaction_cost_model(&self) -> &Arc<dyn CostModel> {
        &self.transaction_cost
    }

    pub fn holding_cost_model(&self) -> &Arc<dyn CostModel> {
        &self.holding_cost
    }

    /// Holding cost accrued up to `final_index`.
    pub fn holding_cost(&self, final_index: usize) -> f64 {
        self.holding_cost.holding_cost(self, final_index)
    }

    /// Profit before any costs, valuing the entry amount at `final_price`.
    pub fn gross_profit_at(&self, final_price: f64) -> f64 {
        let Some(entry) = &self.entry else {
            return 0.0;
        };
        let gross = entry.amount() * final_price - entry.value();
        if entry.is_buy() { gross } else { -gross }
    }

    /// Gross profit of a closed position; 0 otherwise.
    pub fn gross_profit(&self) -> f64 {
        match &self.exit {
            Some(exit) if self.entry.is_some() => self.gross_profit_at(exit.price()),
            _ => 0.0,
        }
    }

    /// Profit of a closed position net of both trades' costs and the holding
    /// cost; 0 otherwise.
    pub fn profit(&self) -> f64 {
        match (&self.entry, &self.exit) {
            (Some(entry), Some(exit)) => {
                let costs = entry.cost() + exit.cost() + self.holding_cost(exit.index());
                self.gross_profit() - costs
            }
            _ => 0.0,
        }
    }

    /// Return ratio of a closed position: exit/entry for long,
    /// 2 - exit/entry for short. 1 when not closed.
    pub fn gross_return(&self) -> f64 {
        match (&self.entry, &self.exit) {
            (Some(entry), Some(exit)) => {
                let ratio = exit.price() / entry.price();
                if entry.is_buy() { ratio } else { 2.0 - ratio }
            }
            _ => 1.0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.entry, &self.exit) {
            (None, _) => write!(f, "new {} position", self.starting_type),
            (Some(entry), None) => write!(f, "open: entry {}", entry),
            (Some(entry), Some(exit)) => write!(f, "entry {} | exit {}", entry, exit),
        }
    }
}
