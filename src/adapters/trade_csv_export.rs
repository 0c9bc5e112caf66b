//! One CSV row per completed trade.

use crate::domain::error::BacktestError;
use crate::domain::metrics::BacktestResults;
use crate::ports::report_port::ReportPort;
use std::path::Path;
use tracing::info;

pub struct TradeCsvExport;

impl ReportPort for TradeCsvExport {
    fn write(&self, results: &BacktestResults, output_path: &Path) -> Result<(), BacktestError> {
        let report_error = |e: csv::Error| BacktestError::Report {
            reason: format!("{}: {}", output_path.display(), e),
        };

        let mut writer = csv::Writer::from_path(output_path).map_err(report_error)?;
        for trade in &results.trades {
            writer.serialize(trade).map_err(report_error)?;
        }
        writer.flush()?;

        info!(
            trades = results.trades.len(),
            path = %output_path.display(),
            "wrote trade CSV"
        );
        Ok(())
    }
}
