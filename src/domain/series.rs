//! Append-only bar series.
//!
//! Bars are addressed by index; index 0 is the first bar. Once a bar has been
//! appended it never changes, which is what lets indicators cache per index.

use crate::domain::error::TaError;
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, Default)]
pub struct BarSeries {
    name: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bars: Vec::new(),
        }
    }

    pub fn from_bars(name: impl Into<String>, bars: Vec<Bar>) -> Result<Self, TaError> {
        let mut series = Self::new(name);
        for bar in bars {
            series.add_bar(bar)?;
        }
        Ok(series)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a bar. Its date must be strictly after the last bar's date.
    pub fn add_bar(&mut self, bar: Bar) -> Result<(), TaError> {
        if let Some(last) = self.bars.last() {
            if bar.date <= last.date {
                return Err(TaError::Data {
                    reason: format!(
                        "bar dated {} does not follow the last bar dated {}",
                        bar.date, last.date
                    ),
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if `index > end_index()`.
    pub fn bar(&self, index: usize) -> &Bar {
        match self.bars.get(index) {
            Some(bar) => bar,
            None => panic!(
                "bar index {} out of range for series '{}' of {} bars",
                index,
                self.name,
                self.bars.len()
            ),
        }
    }

    pub fn get_bar(&self, index: usize) -> Result<&Bar, TaError> {
        self.bars.get(index).ok_or(TaError::IndexOutOfRange {
            index,
            bar_count: self.bars.len(),
        })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn begin_index(&self) -> usize {
        0
    }

    /// Index of the last bar. An empty series reports 0.
    pub fn end_index(&self) -> usize {
        self.bars.len().saturating_sub(1)
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn check_index(&self, index: usize) -> Result<(), TaError> {
        if index < self.bars.len() {
            Ok(())
        } else {
            Err(TaError::IndexOutOfRange {
                index,
                bar_count: self.bars.len(),
            })
        }
    }
}
