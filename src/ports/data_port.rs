//! Market data port trait.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use chrono::NaiveDateTime;

pub trait DataPort {
    /// Bars for `symbol` with `start <= timestamp <= end`, ascending and
    /// free of duplicate timestamps.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, BacktestError>;

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError>;
}
