//! Report generation port.

use crate::domain::error::AllocbtError;
use crate::domain::metrics::Metrics;
use crate::domain::runner::BacktestTable;

/// Port for writing backtest results.
pub trait ReportPort {
    fn write(
        &self,
        table: &BacktestTable,
        metrics: &[(String, Metrics)],
        output_path: &str,
    ) -> Result<(), AllocbtError>;
}
