//! Backtest engine: a sequential fold of strategy decisions over time.
//!
//! Each step hands the strategy the history up to and including that step,
//! clamps its allocation with the [`ConstraintPolicy`], prices it with the
//! [`FeeModel`], and applies it to the portfolio only if the whole trade is
//! affordable. The portfolio value after every step is recorded.

use chrono::NaiveDateTime;

use super::constraint::ConstraintPolicy;
use super::error::AllocbtError;
use super::fees::FeeModel;
use super::frame::Frame;
use super::portfolio::{PortfolioState, dot};
use super::strategy::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub use_fees: bool,
    pub fee_rate: f64,
    pub allow_short_position: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 100_000.0,
            use_fees: true,
            fee_rate: 0.004,
            allow_short_position: false,
        }
    }
}

/// Portfolio value per step for one strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSeries {
    pub name: String,
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl ValueSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Full engine state recorded after one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub timestamp: NaiveDateTime,
    pub capital: f64,
    pub holdings: Vec<f64>,
    pub total_value: f64,
    /// The strategy's allocation was executed this step.
    pub traded: bool,
    /// Trading was halted and the strategy was not consulted.
    pub frozen: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestTrace {
    pub name: String,
    pub steps: Vec<StepRecord>,
}

impl BacktestTrace {
    pub fn into_series(self) -> ValueSeries {
        let (timestamps, values) = self
            .steps
            .iter()
            .map(|s| (s.timestamp, s.total_value))
            .unzip();
        ValueSeries {
            name: self.name,
            timestamps,
            values,
        }
    }
}

/// Run one strategy over the data and return its value series.
pub fn run_backtest(
    strategy: &mut dyn Strategy,
    features: &Frame,
    prices: &Frame,
    config: &BacktestConfig,
) -> Result<ValueSeries, AllocbtError> {
    let mut values = Vec::with_capacity(prices.len());
    simulate(strategy, features, prices, config, |_, _, total_value, _, _| {
        values.push(total_value)
    })?;
    Ok(ValueSeries {
        name: strategy.name().to_string(),
        timestamps: prices.timestamps().to_vec(),
        values,
    })
}

/// Like [`run_backtest`], but keeps capital and holdings for every step.
pub fn run_backtest_traced(
    strategy: &mut dyn Strategy,
    features: &Frame,
    prices: &Frame,
    config: &BacktestConfig,
) -> Result<BacktestTrace, AllocbtError> {
    let mut steps = Vec::with_capacity(prices.len());
    simulate(
        strategy,
        features,
        prices,
        config,
        |i, state, total_value, traded, frozen| {
            steps.push(StepRecord {
                timestamp: prices.timestamps()[i],
                capital: state.capital,
                holdings: state.holdings.clone(),
                total_value,
                traded,
                frozen,
            })
        },
    )?;
    Ok(BacktestTrace {
        name: strategy.name().to_string(),
        steps,
    })
}

fn simulate<F>(
    strategy: &mut dyn Strategy,
    features: &Frame,
    prices: &Frame,
    config: &BacktestConfig,
    mut record: F,
) -> Result<(), AllocbtError>
where
    F: FnMut(usize, &PortfolioState, f64, bool, bool),
{
    if features.len() != prices.len() {
        return Err(AllocbtError::LengthMismatch {
            features: features.len(),
            prices: prices.len(),
        });
    }

    let asset_count = prices.width();
    let fees = FeeModel::new(config.use_fees, config.fee_rate);
    let policy = ConstraintPolicy::new(config.allow_short_position);
    let mut state = PortfolioState::new(config.initial_capital, asset_count);
    let mut total_value = config.initial_capital;
    let mut frozen = false;

    tracing::info!(
        strategy = strategy.name(),
        steps = prices.len(),
        assets = asset_count,
        "starting backtest"
    );

    for i in 0..prices.len() {
        let current = prices.row(i);
        if current.iter().any(|p| !p.is_finite()) {
            return Err(AllocbtError::NonFinite {
                step: i,
                what: "price".into(),
            });
        }

        // Once the value has dropped to zero or below the strategy is never
        // consulted again; later steps only re-mark the frozen position.
        if !frozen && total_value <= 0.0 {
            frozen = true;
            tracing::debug!(
                strategy = strategy.name(),
                step = i,
                total_value,
                "portfolio insolvent, trading halted"
            );
        }

        let mut traded = false;
        if !frozen {
            let mut allocation = strategy.iterate(
                features.prefix(i + 1),
                prices.prefix(i + 1),
                &state.holdings,
                state.capital,
            );
            if allocation.len() != asset_count {
                return Err(AllocbtError::AllocationLength {
                    step: i,
                    expected: asset_count,
                    actual: allocation.len(),
                });
            }
            if allocation.iter().any(|a| !a.is_finite()) {
                return Err(AllocbtError::NonFinite {
                    step: i,
                    what: "allocation".into(),
                });
            }

            policy.apply(&mut allocation, &state.holdings, state.capital);
            let asking = dot(current, &allocation) + fees.fee(current, &allocation);

            if asking <= state.capital && state.capital > 0.0 {
                state.execute(&allocation, asking);
                traded = true;
            } else {
                tracing::debug!(
                    strategy = strategy.name(),
                    step = i,
                    asking,
                    capital = state.capital,
                    "trade skipped"
                );
            }
        }

        total_value = state.total_value(current);
        if !total_value.is_finite() {
            return Err(AllocbtError::NonFinite {
                step: i,
                what: "total value".into(),
            });
        }

        record(i, &state, total_value, traded, frozen);
    }

    tracing::info!(
        strategy = strategy.name(),
        final_value = total_value,
        "backtest finished"
    );
    Ok(())
}
