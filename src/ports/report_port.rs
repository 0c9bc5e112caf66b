//! Report output port trait.

use crate::domain::error::BacktestError;
use crate::domain::metrics::BacktestResults;
use std::path::Path;

/// Writes a finished run somewhere. Never touches simulation state.
pub trait ReportPort {
    fn write(&self, results: &BacktestResults, output_path: &Path) -> Result<(), BacktestError>;
}
