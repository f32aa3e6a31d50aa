//! CSV report writer.
//!
//! Writes the value table as `timestamp,<strategy>,...` and a metrics summary
//! next to it as `<stem>_metrics.csv`.

use crate::domain::error::AllocbtError;
use crate::domain::metrics::Metrics;
use crate::domain::runner::BacktestTable;
use crate::ports::report_port::ReportPort;
use std::path::{Path, PathBuf};

pub struct CsvReportAdapter;

fn csv_error(e: csv::Error) -> AllocbtError {
    AllocbtError::Io(std::io::Error::other(e))
}

/// Path of the metrics summary that accompanies `output_path`.
pub fn metrics_path(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    output_path.with_file_name(format!("{}_metrics.csv", stem))
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        table: &BacktestTable,
        metrics: &[(String, Metrics)],
        output_path: &str,
    ) -> Result<(), AllocbtError> {
        let path = Path::new(output_path);

        let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;
        let mut header = vec!["timestamp".to_string()];
        header.extend(table.columns().iter().cloned());
        wtr.write_record(&header).map_err(csv_error)?;
        for (i, ts) in table.timestamps().iter().enumerate() {
            let mut record = vec![ts.format("%Y-%m-%d %H:%M:%S").to_string()];
            record.extend(table.row(i).iter().map(|v| v.to_string()));
            wtr.write_record(&record).map_err(csv_error)?;
        }
        wtr.flush()?;

        let mut wtr = csv::Writer::from_path(metrics_path(path)).map_err(csv_error)?;
        wtr.write_record([
            "strategy",
            "final_value",
            "total_return",
            "annualized_return",
            "sharpe_ratio",
            "sortino_ratio",
            "max_drawdown",
            "max_drawdown_duration",
        ])
        .map_err(csv_error)?;
        for (name, m) in metrics {
            wtr.write_record([
                name.clone(),
                m.final_value.to_string(),
                m.total_return.to_string(),
                m.annualized_return.to_string(),
                m.sharpe_ratio.to_string(),
                m.sortino_ratio.to_string(),
                m.max_drawdown.to_string(),
                m.max_drawdown_duration.to_string(),
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
