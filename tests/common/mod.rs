#![allow(dead_code)]

use allocbt::domain::frame::{Frame, FrameView};
use allocbt::domain::strategy::Strategy;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn ts(day: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(day)
}

/// Price frame with one column per asset; `rows[i]` is step `i`.
pub fn price_frame(rows: Vec<Vec<f64>>) -> Frame {
    let width = rows.first().map(Vec::len).unwrap_or(1);
    Frame::new(
        (0..rows.len()).map(|i| ts(i as i64)).collect(),
        (0..width).map(|i| format!("ASSET{i}")).collect(),
        rows,
    )
    .unwrap()
}

pub fn single_asset(prices: &[f64]) -> Frame {
    price_frame(prices.iter().map(|&p| vec![p]).collect())
}

/// Returns a fixed allocation per step; zeros after the script runs out.
pub struct Scripted {
    pub name: String,
    pub steps: Vec<Vec<f64>>,
    pub calls: Arc<AtomicUsize>,
}

impl Scripted {
    pub fn new(name: &str, steps: Vec<Vec<f64>>) -> Self {
        Scripted {
            name: name.to_string(),
            steps,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn iterate(
        &mut self,
        _features: FrameView<'_>,
        prices: FrameView<'_>,
        holdings: &[f64],
        _capital: f64,
    ) -> Vec<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.steps
            .get(prices.len() - 1)
            .cloned()
            .unwrap_or_else(|| vec![0.0; holdings.len()])
    }
}

/// Trades on the latest feature value: buys `quantity` of every asset when
/// the first feature column is positive, sells it when negative.
pub struct FeatureSign {
    pub quantity: f64,
}

impl Strategy for FeatureSign {
    fn name(&self) -> &str {
        "FeatureSign"
    }

    fn iterate(
        &mut self,
        features: FrameView<'_>,
        _prices: FrameView<'_>,
        holdings: &[f64],
        _capital: f64,
    ) -> Vec<f64> {
        let signal = features.last_row().map(|r| r[0]).unwrap_or(0.0);
        let delta = if signal > 0.0 {
            self.quantity
        } else if signal < 0.0 {
            -self.quantity
        } else {
            0.0
        };
        vec![delta; holdings.len()]
    }
}

/// Records how many rows of history it saw on each call.
pub struct HistoryProbe {
    pub seen: Vec<usize>,
}

impl Strategy for HistoryProbe {
    fn name(&self) -> &str {
        "HistoryProbe"
    }

    fn iterate(
        &mut self,
        features: FrameView<'_>,
        prices: FrameView<'_>,
        holdings: &[f64],
        _capital: f64,
    ) -> Vec<f64> {
        assert_eq!(features.len(), prices.len());
        self.seen.push(prices.len());
        vec![0.0; holdings.len()]
    }
}

pub fn write_file(dir: &std::path::Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
