//! Time-indexed tables of feature data and asset prices.
//!
//! A [`Frame`] owns its rows. Strategies only ever see a [`FrameView`], a
//! borrowed prefix that ends at the current step, so there is no way for a
//! decision to read a row from the future.

use crate::domain::error::AllocbtError;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    timestamps: Vec<NaiveDateTime>,
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl Frame {
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        columns: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, AllocbtError> {
        if timestamps.len() != rows.len() {
            return Err(AllocbtError::Data {
                reason: format!(
                    "{} timestamps for {} rows",
                    timestamps.len(),
                    rows.len()
                ),
            });
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(AllocbtError::Data {
                reason: format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    columns.len()
                ),
            });
        }
        Ok(Self {
            timestamps,
            columns,
            rows,
        })
    }

    /// Build one price table from per-symbol `(timestamp, price)` series.
    ///
    /// Only timestamps present in every series are kept, in ascending order.
    pub fn align(series: &[(String, Vec<(NaiveDateTime, f64)>)]) -> Result<Self, AllocbtError> {
        if series.is_empty() {
            return Err(AllocbtError::Data {
                reason: "no series to align".into(),
            });
        }

        let lookups: Vec<HashMap<NaiveDateTime, f64>> = series
            .iter()
            .map(|(_, points)| points.iter().copied().collect())
            .collect();

        let shared: BTreeSet<NaiveDateTime> = series[0]
            .1
            .iter()
            .map(|(ts, _)| *ts)
            .filter(|ts| lookups.iter().all(|l| l.contains_key(ts)))
            .collect();

        let timestamps: Vec<NaiveDateTime> = shared.into_iter().collect();
        let rows = timestamps
            .iter()
            .map(|ts| lookups.iter().map(|l| l[ts]).collect())
            .collect();
        let columns = series.iter().map(|(name, _)| name.clone()).collect();

        Self::new(timestamps, columns, rows)
    }

    /// Rows of this frame at exactly `timestamps`, in that order.
    ///
    /// Storage order does not matter. Extra rows are dropped; a missing or
    /// repeated timestamp is an error.
    pub fn reindex(&self, timestamps: &[NaiveDateTime]) -> Result<Self, AllocbtError> {
        let mut index = HashMap::with_capacity(self.timestamps.len());
        for (i, ts) in self.timestamps.iter().enumerate() {
            if index.insert(*ts, i).is_some() {
                return Err(AllocbtError::Data {
                    reason: format!("timestamp {} appears more than once", ts),
                });
            }
        }
        let rows = timestamps
            .iter()
            .map(|ts| {
                index
                    .get(ts)
                    .map(|&i| self.rows[i].clone())
                    .ok_or_else(|| AllocbtError::Data {
                        reason: format!("no row for timestamp {}", ts),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(timestamps.to_vec(), self.columns.clone(), rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns (assets, for a price frame).
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The first `n` rows, clamped to the frame length.
    pub fn prefix(&self, n: usize) -> FrameView<'_> {
        let n = n.min(self.rows.len());
        FrameView {
            timestamps: &self.timestamps[..n],
            columns: &self.columns,
            rows: &self.rows[..n],
        }
    }
}

/// Read-only history up to and including the current step.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    timestamps: &'a [NaiveDateTime],
    columns: &'a [String],
    rows: &'a [Vec<f64>],
}

impl<'a> FrameView<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    pub fn timestamps(&self) -> &'a [NaiveDateTime] {
        self.timestamps
    }

    pub fn row(&self, i: usize) -> Option<&'a [f64]> {
        self.rows.get(i).map(Vec::as_slice)
    }

    pub fn last_row(&self) -> Option<&'a [f64]> {
        self.rows.last().map(Vec::as_slice)
    }

    pub fn column(&self, name: &str) -> Result<Vec<f64>, AllocbtError> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| AllocbtError::UnknownColumn {
                name: name.to_string(),
            })?;
        Ok(self.rows.iter().map(|r| r[idx]).collect())
    }
}

/// Parse a timestamp cell: `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, or a
/// bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_frame() -> Frame {
        Frame::new(
            vec![ts(1), ts(2), ts(3)],
            vec!["BHP".into(), "CBA".into()],
            vec![vec![10.0, 20.0], vec![11.0, 21.0], vec![12.0, 22.0]],
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_ragged_rows() {
        let err = Frame::new(
            vec![ts(1), ts(2)],
            vec!["A".into(), "B".into()],
            vec![vec![1.0, 2.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, AllocbtError::Data { .. }));
    }

    #[test]
    fn new_rejects_timestamp_count_mismatch() {
        let err = Frame::new(vec![ts(1)], vec!["A".into()], vec![vec![1.0], vec![2.0]])
            .unwrap_err();
        assert!(matches!(err, AllocbtError::Data { .. }));
    }

    #[test]
    fn prefix_ends_at_requested_row() {
        let frame = sample_frame();
        let view = frame.prefix(2);
        assert_eq!(view.len(), 2);
        assert_eq!(view.last_row(), Some(&[11.0, 21.0][..]));
        assert!(view.row(2).is_none());
        assert_eq!(view.timestamps(), &[ts(1), ts(2)]);
    }

    #[test]
    fn prefix_clamps_to_length() {
        let frame = sample_frame();
        assert_eq!(frame.prefix(10).len(), 3);
        assert!(frame.prefix(0).is_empty());
    }

    #[test]
    fn column_by_name() {
        let frame = sample_frame();
        let view = frame.prefix(3);
        assert_eq!(view.column("CBA").unwrap(), vec![20.0, 21.0, 22.0]);
        assert!(matches!(
            view.column("XYZ"),
            Err(AllocbtError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn align_keeps_shared_timestamps_in_order() {
        let series = vec![
            (
                "BHP".to_string(),
                vec![(ts(3), 12.0), (ts(1), 10.0), (ts(2), 11.0)],
            ),
            ("CBA".to_string(), vec![(ts(1), 20.0), (ts(3), 22.0)]),
        ];
        let frame = Frame::align(&series).unwrap();
        assert_eq!(frame.timestamps(), &[ts(1), ts(3)]);
        assert_eq!(frame.columns(), &["BHP".to_string(), "CBA".to_string()]);
        assert_eq!(frame.row(0), &[10.0, 20.0]);
        assert_eq!(frame.row(1), &[12.0, 22.0]);
    }

    #[test]
    fn reindex_follows_target_order() {
        let stored_backwards = Frame::new(
            vec![ts(4), ts(3), ts(2), ts(1)],
            vec!["signal".into()],
            vec![vec![4.0], vec![3.0], vec![2.0], vec![1.0]],
        )
        .unwrap();
        let frame = stored_backwards.reindex(&[ts(1), ts(2), ts(3)]).unwrap();
        assert_eq!(frame.timestamps(), &[ts(1), ts(2), ts(3)]);
        assert_eq!(frame.row(0), &[1.0]);
        assert_eq!(frame.row(2), &[3.0]);
    }

    #[test]
    fn reindex_missing_timestamp_is_error() {
        let err = sample_frame().reindex(&[ts(1), ts(5)]).unwrap_err();
        assert!(matches!(err, AllocbtError::Data { reason } if reason.contains("2024-01-05")));
    }

    #[test]
    fn reindex_rejects_repeated_timestamp() {
        let frame = Frame::new(
            vec![ts(1), ts(1)],
            vec!["signal".into()],
            vec![vec![1.0], vec![2.0]],
        )
        .unwrap();
        assert!(frame.reindex(&[ts(1)]).is_err());
    }

    #[test]
    fn align_empty_is_error() {
        assert!(Frame::align(&[]).is_err());
    }

    #[test]
    fn parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-01-02"), Some(ts(2)));
        assert_eq!(
            parse_timestamp("2024-01-02 09:30:00"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 30, 0)
        );
        assert_eq!(
            parse_timestamp("2024-01-02T09:30:00"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 30, 0)
        );
        assert!(parse_timestamp("02/01/2024").is_none());
    }
}
