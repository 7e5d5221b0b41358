//! CSV file data adapter.
//!
//! One file per symbol and timeframe, named `{SYMBOL}_{TIMEFRAME}.csv`, with
//! a `date,open,high,low,close,volume` header and ISO dates.

use crate::domain::error::ScreenerError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use log::warn;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl From<CsvRow> for OhlcvBar {
    fn from(row: CsvRow) -> Self {
        OhlcvBar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        }
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, timeframe))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(&self, symbol: &str, timeframe: &str) -> Result<Vec<OhlcvBar>, ScreenerError> {
        let path = self.csv_path(symbol, timeframe);
        let no_data = || ScreenerError::NoData {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(no_data()),
            Err(e) => {
                return Err(ScreenerError::Data {
                    reason: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars: Vec<OhlcvBar> = Vec::new();
        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = result.map_err(|e| ScreenerError::Data {
                reason: format!("{} row {}: {}", path.display(), line + 1, e),
            })?;
            bars.push(row.into());
        }

        if bars.is_empty() {
            return Err(no_data());
        }

        bars.sort_by_key(|b| b.date);
        let before = bars.len();
        bars.dedup_by_key(|b| b.date);
        if bars.len() < before {
            warn!(
                "{}: dropped {} duplicate dates",
                path.display(),
                before - bars.len()
            );
        }
        Ok(bars)
    }

    fn list_symbols(&self, timeframe: &str) -> Result<Vec<String>, ScreenerError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| ScreenerError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", timeframe);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            match name_str.strip_suffix(&suffix) {
                Some(symbol) if !symbol.is_empty() => symbols.push(symbol.to_string()),
                _ => {}
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
