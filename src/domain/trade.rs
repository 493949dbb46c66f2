//! Individual buy and sell events.

use std::fmt;

use crate::domain::cost::CostModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn complement(self) -> Self {
        match self {
            TradeType::Buy => TradeType::Sell,
            TradeType::Sell => TradeType::Buy,
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Buy => f.write_str("BUY"),
            TradeType::Sell => f.write_str("SELL"),
        }
    }
}

/// An executed trade. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    index: usize,
    trade_type: TradeType,
    price: f64,
    amount: f64,
    cost: f64,
    net_price: f64,
}

impl Trade {
    /// Record a trade, pricing it with `cost_model`.
    pub fn new(
        index: usize,
        trade_type: TradeType,
        price: f64,
        amount: f64,
        cost_model: &dyn CostModel,
    ) -> Self {
        let cost = cost_model.transaction_cost(price, amount);
        let net_price = if amount == 0.0 {
            price
        } else {
            let per_unit = cost / amount;
            match trade_type {
                TradeType::Buy => price + per_unit,
                TradeType::Sell => price - per_unit,
            }
        };
        Trade {
            index,
            trade_type,
            price,
            amount,
            cost,
            net_price,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn trade_type(&self) -> TradeType {
        self.trade_type
    }

    pub fn is_buy(&self) -> bool {
        self.trade_type == TradeType::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.trade_type == TradeType::Sell
    }

    /// Raw execution price per unit.
    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Transaction cost charged for the whole trade.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Price per unit with the transaction cost folded in: higher than the
    /// raw price for a buy, lower for a sell.
    pub fn net_price(&self) -> f64 {
        self.net_price
    }

    /// price * amount
    pub fn value(&self) -> f64 {
        self.price * self.amount
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {:.4} (index {}, cost {:.4})",
            self.trade_type, self.amount, self.price, self.index, self.cost
        )
    }
}
