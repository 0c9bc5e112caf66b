//! CSV file data adapter.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, with the header
//! `timestamp,open,high,low,close,volume`. Timestamps are
//! `%Y-%m-%d %H:%M:%S` or plain `%Y-%m-%d` (midnight).

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn data_error(reason: impl Into<String>) -> BacktestError {
    BacktestError::Data {
        reason: reason.into(),
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_price(record: &csv::StringRecord, index: usize, name: &str, line: u64) -> Result<f64, BacktestError> {
    let raw = record
        .get(index)
        .ok_or_else(|| data_error(format!("line {}: missing {} column", line, name)))?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| data_error(format!("line {}: invalid {} value '{}': {}", line, name, raw, e)))?;
    if !value.is_finite() {
        return Err(data_error(format!("line {}: {} is not finite", line, name)));
    }
    Ok(value)
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, BacktestError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let ts_str = record
                .get(0)
                .ok_or_else(|| data_error(format!("line {}: missing timestamp column", line)))?;
            let timestamp = parse_timestamp(ts_str).ok_or_else(|| {
                data_error(format!("line {}: invalid timestamp '{}'", line, ts_str))
            })?;

            if timestamp < start || timestamp > end {
                continue;
            }

            bars.push(Bar {
                timestamp,
                open: parse_price(&record, 1, "open", line)?,
                high: parse_price(&record, 2, "high", line)?,
                low: parse_price(&record, 3, "low", line)?,
                close: parse_price(&record, 4, "close", line)?,
                volume: parse_price(&record, 5, "volume", line)?,
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        if let Some(pair) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(BacktestError::DuplicateBar {
                timestamp: pair[0].timestamp,
            });
        }

        debug!(symbol, bars = bars.len(), path = %path.display(), "loaded bars");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv")
                && let Some(stem) = path.file_stem()
            {
                symbols.push(stem.to_string_lossy().into_owned());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
