//! CSV file data adapter.
//!
//! One file per series, `<base>/<name>.csv`, with a header row and columns
//! `date,open,high,low,close,volume[,amount]`. Dates are `YYYY-MM-DD`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::error::TaError;
use crate::domain::ohlcv::Bar;
use crate::domain::series::BarSeries;
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

fn data_error(reason: impl Into<String>) -> TaError {
    TaError::Data {
        reason: reason.into(),
    }
}

fn field<'r>(record: &'r csv::StringRecord, column: usize, name: &str, line: u64) -> Result<&'r str, TaError> {
    record
        .get(column)
        .ok_or_else(|| data_error(format!("line {line}: missing {name} column")))
}

fn number(record: &csv::StringRecord, column: usize, name: &str, line: u64) -> Result<f64, TaError> {
    let text = field(record, column, name, line)?;
    text.parse()
        .map_err(|e| data_error(format!("line {line}: invalid {name} value '{text}': {e}")))
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{name}.csv"))
    }

    /// Read one CSV file into a series called `name`, sorted by date.
    pub fn read_file(path: &Path, name: &str) -> Result<BarSeries, TaError> {
        let content = fs::read_to_string(path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {e}")))?;
            let line = record.position().map_or(0, |p| p.line());

            let date_text = field(&record, 0, "date", line)?;
            let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d").map_err(|e| {
                data_error(format!("line {line}: invalid date '{date_text}': {e}"))
            })?;

            let mut bar = Bar::new(
                date,
                number(&record, 1, "open", line)?,
                number(&record, 2, "high", line)?,
                number(&record, 3, "low", line)?,
                number(&record, 4, "close", line)?,
                number(&record, 5, "volume", line)?,
            );
            if record.get(6).is_some_and(|amount| !amount.is_empty()) {
                bar = bar.with_amount(number(&record, 6, "amount", line)?);
            }
            bars.push(bar);
        }

        if bars.is_empty() {
            return Err(TaError::NoData {
                name: name.to_string(),
            });
        }
        bars.sort_by_key(|b| b.date);
        BarSeries::from_bars(name, bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_series(&self, name: &str) -> Result<BarSeries, TaError> {
        Self::read_file(&self.csv_path(name), name)
    }

    fn list_series(&self) -> Result<Vec<String>, TaError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
