//! Comparison of a strategy against a passive buy-and-hold baseline.

use super::backtest::BacktestConfig;
use super::error::AllocbtError;
use super::frame::Frame;
use super::runner::{BacktestTable, run_multi_strategy};
use super::strategy::{BuyAndHold, Strategy};

/// Run `strategy` next to a [`BuyAndHold`] baseline built with the same fee
/// rate. The table has the strategy's column first, then `BuyAndHold`.
pub fn run_against_buy_and_hold(
    strategy: Box<dyn Strategy>,
    features: &Frame,
    prices: &Frame,
    config: &BacktestConfig,
) -> Result<BacktestTable, AllocbtError> {
    let baseline: Box<dyn Strategy> = Box::new(BuyAndHold::new(config.fee_rate));
    let mut strategies = vec![strategy, baseline];
    run_multi_strategy(&mut strategies, features, prices, config)
}

/// Per-step ratio of `target` to `baseline`. Steps where the baseline is not
/// positive yield NaN.
pub fn relative_performance(
    table: &BacktestTable,
    target: &str,
    baseline: &str,
) -> Result<Vec<f64>, AllocbtError> {
    let target = table.column(target)?;
    let baseline = table.column(baseline)?;
    Ok(target
        .iter()
        .zip(baseline)
        .map(|(t, b)| if *b > 0.0 { t / b } else { f64::NAN })
        .collect())
}
