//! Full results object as pretty-printed JSON.

use crate::domain::error::BacktestError;
use crate::domain::metrics::BacktestResults;
use crate::ports::report_port::ReportPort;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub struct JsonReport;

impl JsonReport {
    pub fn to_string(results: &BacktestResults) -> Result<String, BacktestError> {
        serde_json::to_string_pretty(results).map_err(|e| BacktestError::Report {
            reason: e.to_string(),
        })
    }
}

impl ReportPort for JsonReport {
    fn write(&self, results: &BacktestResults, output_path: &Path) -> Result<(), BacktestError> {
        let file = File::create(output_path).map_err(|e| BacktestError::Report {
            reason: format!("{}: {}", output_path.display(), e),
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, results).map_err(|e| BacktestError::Report {
            reason: e.to_string(),
        })?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        info!(path = %output_path.display(), "wrote JSON report");
        Ok(())
    }
}
