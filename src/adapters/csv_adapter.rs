//! CSV file data adapter.
//!
//! Per-symbol bar files live in one directory as `{SYMBOL}.csv` with a
//! header row; only the `timestamp` (or `date`) and `close` columns are read.
//! Feature tables are wide CSV files: a timestamp column followed by one
//! numeric column per feature.

use crate::domain::error::AllocbtError;
use crate::domain::frame::{Frame, parse_timestamp};
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

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

fn in_range(ts: NaiveDateTime, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    let date = ts.date();
    start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
}

fn header_index(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

fn parse_value(cell: Option<&str>, what: &str, row: usize) -> Result<f64, AllocbtError> {
    cell.ok_or_else(|| AllocbtError::Data {
        reason: format!("missing {} on row {}", what, row),
    })?
    .trim()
    .parse()
    .map_err(|e| AllocbtError::Data {
        reason: format!("invalid {} value on row {}: {}", what, row, e),
    })
}

fn parse_ts(cell: Option<&str>, row: usize) -> Result<NaiveDateTime, AllocbtError> {
    let cell = cell.ok_or_else(|| AllocbtError::Data {
        reason: format!("missing timestamp on row {}", row),
    })?;
    parse_timestamp(cell).ok_or_else(|| AllocbtError::Data {
        reason: format!("invalid timestamp {:?} on row {}", cell, row),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_closes(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<(NaiveDateTime, f64)>, AllocbtError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| AllocbtError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| AllocbtError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?
            .clone();
        let ts_col = header_index(&headers, &["timestamp", "date"]).ok_or_else(|| {
            AllocbtError::Data {
                reason: format!("{} has no timestamp column", path.display()),
            }
        })?;
        let close_col = header_index(&headers, &["close"]).ok_or_else(|| AllocbtError::Data {
            reason: format!("{} has no close column", path.display()),
        })?;

        let mut closes = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| AllocbtError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let ts = parse_ts(record.get(ts_col), row)?;
            if !in_range(ts, start, end) {
                continue;
            }
            let close = parse_value(record.get(close_col), "close", row)?;
            closes.push((ts, close));
        }

        closes.sort_by_key(|(ts, _)| *ts);
        Ok(closes)
    }

    fn list_symbols(&self) -> Result<Vec<String>, AllocbtError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| AllocbtError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AllocbtError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

/// Assemble an aligned price table for `symbols` from a data port.
pub fn load_price_frame(
    port: &dyn DataPort,
    symbols: &[String],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Frame, AllocbtError> {
    let mut series = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let closes = port.fetch_closes(symbol, start, end)?;
        if closes.is_empty() {
            return Err(AllocbtError::Data {
                reason: format!("no data for {}", symbol),
            });
        }
        series.push((symbol.clone(), closes));
    }
    Frame::align(&series)
}

/// Read a wide CSV (`timestamp,<col>,...`) into a frame.
pub fn read_frame<P: AsRef<Path>>(
    path: P,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Frame, AllocbtError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| AllocbtError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| AllocbtError::Data {
            reason: format!("CSV parse error in {}: {}", path.display(), e),
        })?
        .clone();
    let columns: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

    let mut timestamps = Vec::new();
    let mut rows = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| AllocbtError::Data {
            reason: format!("CSV parse error: {}", e),
        })?;
        let ts = parse_ts(record.get(0), row)?;
        if !in_range(ts, start, end) {
            continue;
        }
        let values = columns
            .iter()
            .enumerate()
            .map(|(i, name)| parse_value(record.get(i + 1), name, row))
            .collect::<Result<Vec<f64>, _>>()?;
        timestamps.push(ts);
        rows.push(values);
    }

    Frame::new(timestamps, columns, rows)
}
