//! Backtest loop.
//!
//! Walks the series bar by bar, asks the strategy whether to operate, and
//! records trades at each bar's close. Costs come from `BacktestConfig`.

use std::sync::Arc;

use tracing::info;

use crate::domain::cost::{
    CostModel, FixedTransactionCost, LinearBorrowingCost, LinearTransactionCost, ZeroCost,
};
use crate::domain::error::TaError;
use crate::domain::series::BarSeries;
use crate::domain::strategy::Strategy;
use crate::domain::trade::TradeType;
use crate::domain::trading_record::TradingRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Side of every entry: `Buy` trades long, `Sell` trades short.
    pub trade_type: TradeType,
    pub amount: f64,
    pub commission_per_trade: f64,
    /// Percent of traded value.
    pub commission_pct: f64,
    /// Percent of entry value charged per bar a short position is held.
    pub borrowing_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            trade_type: TradeType::Buy,
            amount: 1.0,
            commission_per_trade: 0.0,
            commission_pct: 0.0,
            borrowing_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    /// (transaction cost model, holding cost model)
    pub fn cost_models(&self) -> Result<(Arc<dyn CostModel>, Arc<dyn CostModel>), TaError> {
        if self.commission_per_trade > 0.0 && self.commission_pct > 0.0 {
            return Err(TaError::invalid(
                "commission",
                "set commission_per_trade or commission_pct, not both",
            ));
        }
        let transaction: Arc<dyn CostModel> = if self.commission_per_trade > 0.0 {
            Arc::new(FixedTransactionCost::new(self.commission_per_trade)?)
        } else if self.commission_pct > 0.0 {
            Arc::new(LinearTransactionCost::new(self.commission_pct / 100.0)?)
        } else {
            FixedTransactionCost::new(self.commission_per_trade)?;
            LinearTransactionCost::new(self.commission_pct)?;
            Arc::new(ZeroCost)
        };
        let holding: Arc<dyn CostModel> = if self.borrowing_rate > 0.0 {
            Arc::new(LinearBorrowingCost::new(self.borrowing_rate / 100.0)?)
        } else {
            LinearBorrowingCost::new(self.borrowing_rate)?;
            Arc::new(ZeroCost)
        };
        Ok((transaction, holding))
    }
}

fn require_amount(amount: f64) -> Result<(), TaError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(TaError::invalid("amount", format!("must be > 0, got {amount}")));
    }
    Ok(())
}

/// Run `strategy` over every bar of `series`.
///
/// A position still open after the last bar stays open in the returned record.
pub fn run_backtest(
    series: &Arc<BarSeries>,
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<TradingRecord, TaError> {
    require_amount(config.amount)?;
    let (transaction, holding) = config.cost_models()?;
    let mut record = TradingRecord::with_cost_models(config.trade_type, transaction, holding);

    info!(
        strategy = strategy.name(),
        series = series.name(),
        bars = series.bar_count(),
        trade_type = %config.trade_type,
        "backtest started"
    );

    for (index, bar) in series.bars().iter().enumerate() {
        if strategy.should_operate(index, &record) {
            record.operate(index, bar.close, config.amount)?;
        }
    }

    info!(
        strategy = strategy.name(),
        positions = record.position_count(),
        open = record.current_position().is_opened(),
        total_profit = record.total_profit(),
        "backtest finished"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::NumIndicator;
    use crate::domain::indicator::sma::Sma;
    use crate::domain::indicator::test_support::*;
    use crate::domain::rule::{
        BooleanRule, CrossedDownIndicatorRule, CrossedUpIndicatorRule, SharedRule,
    };

    fn sma_cross_strategy(series: &Arc<BarSeries>) -> Strategy {
        let sma: NumIndicator = Arc::new(Sma::new(close(series), 3).unwrap());
        let entry: SharedRule =
            Arc::new(CrossedUpIndicatorRule::new(close(series), sma.clone()).unwrap());
        let exit: SharedRule = Arc::new(CrossedDownIndicatorRule::new(close(series), sma).unwrap());
        Strategy::new("sma cross", entry, exit).with_unstable_bars(3)
    }

    #[test]
    fn default_config_is_cost_free_long() {
        let config = BacktestConfig::default();
        assert_eq!(config.trade_type, TradeType::Buy);
        let (transaction, holding) = config.cost_models().unwrap();
        assert_eq!(transaction.transaction_cost(100.0, 1.0), 0.0);
        let mut record = TradingRecord::new(TradeType::Sell);
        record.enter(0, 100.0, 1.0).unwrap();
        assert_eq!(holding.holding_cost(record.current_position(), 10), 0.0);
    }

    #[test]
    fn percent_commission_becomes_ratio() {
        let config = BacktestConfig {
            commission_pct: 0.5,
            ..BacktestConfig::default()
        };
        let (transaction, _) = config.cost_models().unwrap();
        assert!((transaction.transaction_cost(100.0, 2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn both_commission_kinds_rejected() {
        let config = BacktestConfig {
            commission_per_trade: 1.0,
            commission_pct: 0.1,
            ..BacktestConfig::default()
        };
        assert!(config.cost_models().is_err());
        let config = BacktestConfig {
            borrowing_rate: -1.0,
            ..BacktestConfig::default()
        };
        assert!(config.cost_models().is_err());
    }

    #[test]
    fn sma_cross_round_trip() {
        let series = series_from_closes(&[5.0, 4.0, 3.0, 2.0, 3.0, 4.0, 5.0, 6.0, 5.0, 4.0, 3.0]);
        let record =
            run_backtest(&series, &sma_cross_strategy(&series), &BacktestConfig::default()).unwrap();
        assert_eq!(record.position_count(), 1);
        let position = &record.positions()[0];
        assert_eq!(position.entry().unwrap().index(), 4);
        assert_eq!(position.exit().unwrap().index(), 8);
        assert!((position.profit() - 2.0).abs() < 1e-12);
        assert!(record.is_closed());
    }

    #[test]
    fn open_position_left_open() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        let always: SharedRule = Arc::new(BooleanRule::TRUE);
        let never: SharedRule = Arc::new(BooleanRule::FALSE);
        let strategy = Strategy::new("hold", always, never);
        let record = run_backtest(&series, &strategy, &BacktestConfig::default()).unwrap();
        assert_eq!(record.position_count(), 0);
        assert!(record.current_position().is_opened());
        assert_eq!(record.current_position().entry().unwrap().index(), 0);
    }

    #[test]
    fn short_trading_enters_with_sell() {
        let series = series_from_closes(&[10.0, 8.0, 6.0]);
        let always: SharedRule = Arc::new(BooleanRule::TRUE);
        let strategy = Strategy::new("flip", always.clone(), always);
        let config = BacktestConfig {
            trade_type: TradeType::Sell,
            ..BacktestConfig::default()
        };
        let record = run_backtest(&series, &strategy, &config).unwrap();
        // enter 0, exit 1, enter 2
        assert_eq!(record.position_count(), 1);
        assert!(record.positions()[0].is_short());
        assert!((record.positions()[0].profit() - 2.0).abs() < 1e-12);
        assert!(record.current_position().is_opened());
    }

    #[test]
    fn invalid_amount_rejected() {
        let series = series_from_closes(&[1.0]);
        let strategy = Strategy::new("s", Arc::new(BooleanRule::TRUE), Arc::new(BooleanRule::TRUE));
        let config = BacktestConfig {
            amount: 0.0,
            ..BacktestConfig::default()
        };
        assert!(matches!(
            run_backtest(&series, &strategy, &config),
            Err(TaError::InvalidParameter { name: "amount", .. })
        ));
    }
}
