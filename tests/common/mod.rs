#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use tacore::domain::error::TaError;
use tacore::domain::indicator::NumIndicator;
use tacore::domain::indicator::helpers::{PriceField, PriceIndicator};
pub use tacore::domain::ohlcv::Bar;
use tacore::domain::series::BarSeries;
use tacore::ports::data_port::DataPort;

/// In-memory data port keyed by series name.
pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, name: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(name.to_string(), bars);
        self
    }

    pub fn with_error(mut self, name: &str, reason: &str) -> Self {
        self.errors.insert(name.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(&self, name: &str) -> Result<BarSeries, TaError> {
        if let Some(reason) = self.errors.get(name) {
            return Err(TaError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(name) {
            Some(bars) if !bars.is_empty() => BarSeries::from_bars(name, bars.clone()),
            _ => Err(TaError::NoData {
                name: name.to_string(),
            }),
        }
    }

    fn list_series(&self) -> Result<Vec<String>, TaError> {
        let mut names: Vec<String> = self.data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A bar whose open, high, low and close are all `close`.
pub fn make_bar(date: NaiveDate, close: f64) -> Bar {
    Bar::new(date, close, close, close, close, 1000.0)
}

/// One bar per day starting 2024-01-01.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(start + chrono::Duration::days(i as i64), close))
        .collect()
}

pub fn series_from_closes(closes: &[f64]) -> Arc<BarSeries> {
    Arc::new(BarSeries::from_bars("TEST", bars_from_closes(closes)).unwrap())
}

pub fn close_of(series: &Arc<BarSeries>) -> NumIndicator {
    Arc::new(PriceIndicator::new(series.clone(), PriceField::Close))
}

/// Falls, recovers above its SMA(3) at index 4, then crosses back under at 8.
pub const CROSSING_CLOSES: [f64; 11] = [5.0, 4.0, 3.0, 2.0, 3.0, 4.0, 5.0, 6.0, 5.0, 4.0, 3.0];

/// CSV text for `closes`, one row per day from 2024-01-01.
pub fn csv_from_closes(closes: &[f64]) -> String {
    let mut csv = String::from("date,open,high,low,close,volume\n");
    for bar in bars_from_closes(closes) {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
        ));
    }
    csv
}

pub fn write_temp_file(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
