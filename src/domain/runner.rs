//! Multi-strategy runs over shared data.
//!
//! Every strategy gets its own fresh portfolio; results are merged into a
//! [`BacktestTable`] with one column per strategy, in input order.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::collections::HashSet;

use super::backtest::{BacktestConfig, ValueSeries, run_backtest};
use super::error::AllocbtError;
use super::frame::Frame;
use super::strategy::Strategy;

/// Portfolio values of several strategies on a shared timestamp index.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestTable {
    timestamps: Vec<NaiveDateTime>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl BacktestTable {
    pub fn new(timestamps: Vec<NaiveDateTime>) -> Self {
        BacktestTable {
            timestamps,
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Add a strategy's series as a new column.
    ///
    /// The series must cover exactly the table's timestamps and its name must
    /// not already be a column.
    pub fn push(&mut self, series: ValueSeries) -> Result<(), AllocbtError> {
        if self.columns.contains(&series.name) {
            return Err(AllocbtError::DuplicateStrategy { name: series.name });
        }
        if series.timestamps != self.timestamps {
            return Err(AllocbtError::Data {
                reason: format!(
                    "series {} does not match the table index ({} rows vs {})",
                    series.name,
                    series.timestamps.len(),
                    self.timestamps.len()
                ),
            });
        }
        self.columns.push(series.name);
        self.values.push(series.values);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<&[f64], AllocbtError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i].as_slice())
            .ok_or_else(|| AllocbtError::UnknownColumn {
                name: name.to_string(),
            })
    }

    /// Values of every column at row `i`, in column order.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.values.iter().map(|col| col[i]).collect()
    }
}

/// Run each strategy in turn and collect the results.
pub fn run_multi_strategy(
    strategies: &mut [Box<dyn Strategy>],
    features: &Frame,
    prices: &Frame,
    config: &BacktestConfig,
) -> Result<BacktestTable, AllocbtError> {
    check_unique_names(strategies)?;
    let results = strategies
        .iter_mut()
        .map(|s| run_backtest(s.as_mut(), features, prices, config))
        .collect::<Result<Vec<_>, _>>()?;
    assemble(prices, results)
}

/// Same result as [`run_multi_strategy`], with one rayon task per strategy.
pub fn run_multi_strategy_parallel(
    strategies: &mut [Box<dyn Strategy>],
    features: &Frame,
    prices: &Frame,
    config: &BacktestConfig,
) -> Result<BacktestTable, AllocbtError> {
    check_unique_names(strategies)?;
    let results = strategies
        .par_iter_mut()
        .map(|s| run_backtest(s.as_mut(), features, prices, config))
        .collect::<Result<Vec<_>, _>>()?;
    assemble(prices, results)
}

fn check_unique_names(strategies: &[Box<dyn Strategy>]) -> Result<(), AllocbtError> {
    let mut seen = HashSet::new();
    for s in strategies {
        if !seen.insert(s.name()) {
            return Err(AllocbtError::DuplicateStrategy {
                name: s.name().to_string(),
            });
        }
    }
    Ok(())
}

fn assemble(prices: &Frame, results: Vec<ValueSeries>) -> Result<BacktestTable, AllocbtError> {
    let mut table = BacktestTable::new(prices.timestamps().to_vec());
    for series in results {
        tracing::info!(
            strategy = %series.name,
            final_value = series.values.last().copied().unwrap_or_default(),
            "strategy complete"
        );
        table.push(series)?;
    }
    Ok(table)
}
