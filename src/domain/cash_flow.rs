//! Cash flow (equity curve) reconstruction.
//!
//! Turns a trade history into one equity multiplier per bar: 1.0 at index 0,
//! flat while no position is held, and compounding through each position's
//! return net of transaction and holding costs. Positions are replayed in
//! entry order; each multiplies onto the value at its entry bar.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::error::TaError;
use crate::domain::indicator::Indicator;
use crate::domain::position::Position;
use crate::domain::series::BarSeries;
use crate::domain::trading_record::TradingRecord;

#[derive(Debug, Clone)]
pub struct CashFlow {
    series: Arc<BarSeries>,
    values: Vec<f64>,
}

/// Shift a price by the per-bar holding cost: down for longs, up for shorts.
fn add_cost(price: f64, cost: f64, is_long: bool) -> f64 {
    if is_long { price - cost } else { price + cost }
}

/// Long: price / entry. Short: 2 - price / entry.
fn ratio(is_long: bool, entry_price: f64, price: f64) -> f64 {
    let ratio = price / entry_price;
    if is_long { ratio } else { 2.0 - ratio }
}

impl CashFlow {
    fn flat(series: Arc<BarSeries>) -> Self {
        Self {
            series,
            values: vec![1.0],
        }
    }

    /// Cash flow of a single closed position.
    pub fn from_position(series: Arc<BarSeries>, position: &Position) -> Result<Self, TaError> {
        if position.is_opened() {
            return Err(TaError::PositionStillOpen);
        }
        let mut cash_flow = Self::flat(series);
        if let Some(exit) = position.exit() {
            cash_flow.accrue(position, exit.index());
        }
        cash_flow.fill_to_end();
        Ok(cash_flow)
    }

    /// Cash flow of every closed position in `record`. An open position is
    /// ignored.
    pub fn from_record(series: Arc<BarSeries>, record: &TradingRecord) -> Self {
        let mut cash_flow = Self::flat(series);
        for position in record.positions() {
            if let Some(exit) = position.exit() {
                cash_flow.accrue(position, exit.index());
            }
        }
        cash_flow.fill_to_end();
        cash_flow
    }

    /// Cash flow of `record` with an open position valued up to
    /// `final_index`. Closed positions always run to their own exit bar.
    pub fn from_record_until(
        series: Arc<BarSeries>,
        record: &TradingRecord,
        final_index: usize,
    ) -> Result<Self, TaError> {
        series.check_index(final_index)?;
        let mut cash_flow = Self::flat(series);
        for position in record.positions() {
            if let Some(exit) = position.exit() {
                cash_flow.accrue(position, exit.index());
            }
        }
        let current = record.current_position();
        if current.is_opened() {
            cash_flow.accrue(current, final_index);
        }
        cash_flow.fill_to_end();
        Ok(cash_flow)
    }

    fn put(&mut self, index: usize, value: f64) {
        if index < self.values.len() {
            self.values[index] = value;
        } else {
            self.values.push(value);
        }
    }

    /// Repeat the last value until `len` values exist.
    fn pad_to(&mut self, len: usize) {
        let last = self.values.last().copied().unwrap_or(1.0);
        if self.values.len() < len {
            self.values.resize(len, last);
        }
    }

    fn fill_to_end(&mut self) {
        let len = self.series.bar_count();
        self.pad_to(len);
    }

    fn accrue(&mut self, position: &Position, final_index: usize) {
        let Some(entry) = position.entry() else {
            return;
        };
        if self.series.is_empty() {
            return;
        }
        let end_index = position
            .exit()
            .map_or(final_index, |exit| exit.index().min(final_index))
            .min(self.series.end_index());
        let entry_index = entry.index();
        if entry_index > end_index {
            debug!(entry_index, end_index, "position starts after the observed range");
            return;
        }

        self.pad_to(entry_index + 1);
        let base = self.values[entry_index];
        if !(base > 0.0) {
            warn!(entry_index, base, "skipping position: equity at entry is not positive");
            return;
        }

        let is_long = entry.is_buy();
        let periods = end_index - entry_index;
        let holding_cost = position.holding_cost(end_index);
        let avg_cost = if periods == 0 {
            0.0
        } else {
            holding_cost / periods as f64
        };
        let net_entry = entry.net_price();

        for i in entry_index + 1..end_index {
            let price = add_cost(self.series.bar(i).close, avg_cost, is_long);
            self.put(i, base * ratio(is_long, net_entry, price));
        }

        let exit_price = match position.exit() {
            Some(exit) => exit.net_price(),
            None => self.series.bar(end_index).close,
        };
        let final_value = base * ratio(is_long, net_entry, add_cost(exit_price, avg_cost, is_long));
        self.put(end_index, final_value);

        debug!(
            entry_index,
            end_index,
            holding_cost,
            from = base,
            to = final_value,
            "position accrued"
        );
    }
}

impl Indicator for CashFlow {
    type Output = f64;

    fn value(&self, index: usize) -> f64 {
        self.series.bar(index);
        self.values[index]
    }

    fn unstable_bars(&self) -> usize {
        0
    }

    fn series(&self) -> &Arc<BarSeries> {
        &self.series
    }

    fn values(&self) -> Vec<f64> {
        self.values[..self.series.bar_count()].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cost::{CostModel, FixedTransactionCost, LinearBorrowingCost, ZeroCost};
    use crate::domain::indicator::test_support::*;
    use crate::domain::trade::TradeType;

    fn assert_values(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn empty_record_is_flat() {
        let series = series_from_closes(&[10.0, 11.0, 12.0]);
        let record = TradingRecord::new(TradeType::Buy);
        let cash_flow = CashFlow::from_record(series, &record);
        assert_values(&cash_flow.values(), &[1.0, 1.0, 1.0]);
        assert_eq!(cash_flow.unstable_bars(), 0);
    }

    #[test]
    fn long_round_trip() {
        let series = series_from_closes(&[100.0, 105.0, 110.0, 120.0]);
        let mut record = TradingRecord::new(TradeType::Buy);
        record.enter(0, 100.0, 1.0).unwrap();
        record.exit(2, 110.0, 1.0).unwrap();
        let cash_flow = CashFlow::from_record(series, &record);
        assert_values(&cash_flow.values(), &[1.0, 1.05, 1.1, 1.1]);
    }

    #[test]
    fn short_round_trip() {
        let series = series_from_closes(&[100.0, 105.0, 110.0, 120.0]);
        let mut record = TradingRecord::new(TradeType::Sell);
        record.enter(0, 100.0, 1.0).unwrap();
        record.exit(2, 110.0, 1.0).unwrap();
        let cash_flow = CashFlow::from_record(series, &record);
        assert_values(&cash_flow.values(), &[1.0, 0.95, 0.9, 0.9]);
    }

    #[test]
    fn positions_compound() {
        let series = series_from_closes(&[100.0, 110.0, 50.0, 60.0]);
        let mut record = TradingRecord::new(TradeType::Buy);
        record.enter(0, 100.0, 1.0).unwrap();
        record.exit(1, 110.0, 1.0).unwrap();
        record.enter(2, 50.0, 1.0).unwrap();
        record.exit(3, 60.0, 1.0).unwrap();
        let cash_flow = CashFlow::from_record(series, &record);
        assert_values(&cash_flow.values(), &[1.0, 1.1, 1.1, 1.32]);
    }

    #[test]
    fn idle_bars_between_positions_stay_flat() {
        let series = series_from_closes(&[10.0, 10.0, 20.0, 20.0, 20.0, 10.0]);
        let mut record = TradingRecord::new(TradeType::Buy);
        record.enter(1, 10.0, 1.0).unwrap();
        record.exit(2, 20.0, 1.0).unwrap();
        record.enter(4, 20.0, 1.0).unwrap();
        record.exit(5, 10.0, 1.0).unwrap();
        let cash_flow = CashFlow::from_record(series, &record);
        assert_values(&cash_flow.values(), &[1.0, 1.0, 2.0, 2.0, 2.0, 1.0]);
    }

    #[test]
    fn open_position_only_counted_with_final_index() {
        let series = series_from_closes(&[100.0, 100.0, 110.0, 120.0, 130.0]);
        let mut record = TradingRecord::new(TradeType::Buy);
        record.enter(1, 100.0, 1.0).unwrap();

        let closed_only = CashFlow::from_record(series.clone(), &record);
        assert_values(&closed_only.values(), &[1.0; 5]);

        let accrued = CashFlow::from_record_until(series, &record, 3).unwrap();
        assert_values(&accrued.values(), &[1.0, 1.0, 1.1, 1.2, 1.2]);
    }

    #[test]
    fn closed_positions_keep_their_own_exit_bar() {
        let series = series_from_closes(&[100.0, 110.0, 120.0, 130.0, 130.0]);
        let mut record = TradingRecord::new(TradeType::Buy);
        record.enter(0, 100.0, 1.0).unwrap();
        record.exit(3, 130.0, 1.0).unwrap();
        let cash_flow = CashFlow::from_record_until(series.clone(), &record, 1).unwrap();
        assert_values(&cash_flow.values(), &[1.0, 1.1, 1.2, 1.3, 1.3]);
        assert_eq!(
            cash_flow.values(),
            CashFlow::from_record(series, &record).values()
        );
    }

    #[test]
    fn final_index_only_caps_the_open_position() {
        let series = series_from_closes(&[100.0, 110.0, 120.0, 110.0, 121.0, 132.0]);
        let mut record = TradingRecord::new(TradeType::Buy);
        record.enter(0, 100.0, 1.0).unwrap();
        record.exit(2, 120.0, 1.0).unwrap();
        record.enter(3, 110.0, 1.0).unwrap();
        let cash_flow = CashFlow::from_record_until(series, &record, 4).unwrap();
        assert_values(&cash_flow.values(), &[1.0, 1.1, 1.2, 1.2, 1.32, 1.32]);
    }

    #[test]
    fn final_index_out_of_range() {
        let series = series_from_closes(&[1.0, 2.0]);
        let record = TradingRecord::new(TradeType::Buy);
        assert!(matches!(
            CashFlow::from_record_until(series, &record, 2),
            Err(TaError::IndexOutOfRange {
                index: 2,
                bar_count: 2
            })
        ));
    }

    #[test]
    fn single_position_must_be_closed() {
        let series = series_from_closes(&[100.0, 110.0]);
        let mut position = Position::long();
        position.operate(0, 100.0, 1.0).unwrap();
        assert!(matches!(
            CashFlow::from_position(series.clone(), &position),
            Err(TaError::PositionStillOpen)
        ));
        position.operate(1, 110.0, 1.0).unwrap();
        let cash_flow = CashFlow::from_position(series, &position).unwrap();
        assert_values(&cash_flow.values(), &[1.0, 1.1]);
    }

    #[test]
    fn transaction_costs_reduce_returns() {
        let series = series_from_closes(&[100.0, 100.0, 110.0]);
        let fee: Arc<dyn CostModel> = Arc::new(FixedTransactionCost::new(1.0).unwrap());
        let mut record = TradingRecord::with_cost_models(TradeType::Buy, fee, Arc::new(ZeroCost));
        record.enter(0, 100.0, 1.0).unwrap();
        record.exit(2, 110.0, 1.0).unwrap();
        let cash_flow = CashFlow::from_record(series, &record);
        // net entry 101, net exit 109
        assert_values(&cash_flow.values(), &[1.0, 100.0 / 101.0, 109.0 / 101.0]);
    }

    #[test]
    fn borrowing_cost_spread_over_short() {
        let series = series_from_closes(&[100.0, 100.0, 100.0]);
        let borrow: Arc<dyn CostModel> = Arc::new(LinearBorrowingCost::new(0.01).unwrap());
        let mut record = TradingRecord::with_cost_models(TradeType::Sell, Arc::new(ZeroCost), borrow);
        record.enter(0, 100.0, 1.0).unwrap();
        record.exit(2, 100.0, 1.0).unwrap();
        // holding cost 2.0 over 2 bars: 1.0 per bar added to the price
        let cash_flow = CashFlow::from_record(series, &record);
        assert_values(&cash_flow.values(), &[1.0, 0.99, 0.99]);
    }

    #[test]
    fn non_positive_equity_skips_later_positions() {
        let series = series_from_closes(&[10.0, 30.0, 30.0, 40.0]);
        let mut record = TradingRecord::new(TradeType::Sell);
        record.enter(0, 10.0, 1.0).unwrap();
        record.exit(1, 30.0, 1.0).unwrap();
        record.enter(2, 30.0, 1.0).unwrap();
        record.exit(3, 20.0, 1.0).unwrap();
        let cash_flow = CashFlow::from_record(series, &record);
        assert_values(&cash_flow.values(), &[1.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn same_bar_round_trip_lands_on_entry_bar() {
        let series = series_from_closes(&[100.0, 100.0, 100.0]);
        let mut record = TradingRecord::new(TradeType::Buy);
        record.enter(1, 100.0, 1.0).unwrap();
        record.exit(1, 90.0, 1.0).unwrap();
        let cash_flow = CashFlow::from_record(series, &record);
        assert_values(&cash_flow.values(), &[1.0, 0.9, 0.9]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn value_past_end_panics() {
        let series = series_from_closes(&[1.0]);
        let cash_flow = CashFlow::from_record(series, &TradingRecord::default());
        cash_flow.value(1);
    }
}
