//! Bar data access port trait.

use crate::domain::error::TaError;
use crate::domain::series::BarSeries;

pub trait DataPort {
    /// Every bar of the named series, oldest first.
    fn fetch_series(&self, name: &str) -> Result<BarSeries, TaError>;

    /// Names of the series this source can load, sorted.
    fn list_series(&self) -> Result<Vec<String>, TaError>;
}
