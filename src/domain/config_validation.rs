//! Configuration validation.
//!
//! Validates all config fields before any data is loaded.

use crate::domain::error::AllocbtError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const KNOWN_STRATEGIES: &[&str] = &["buy_and_hold", "momentum"];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), AllocbtError> {
    validate_initial_capital(config)?;
    validate_fee_rate(config)?;
    validate_periods_per_year(config)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), AllocbtError> {
    validate_data_dir(config)?;
    validate_symbols(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), AllocbtError> {
    validate_kinds(config)?;
    validate_momentum(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> AllocbtError {
    AllocbtError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn missing(section: &str, key: &str) -> AllocbtError {
    AllocbtError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), AllocbtError> {
    let value = config.get_double("backtest", "initial_capital", 100_000.0);
    if !(value > 0.0 && value.is_finite()) {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_fee_rate(config: &dyn ConfigPort) -> Result<(), AllocbtError> {
    let value = config.get_double("backtest", "fee_rate", 0.004);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "fee_rate",
            "fee_rate must be in [0, 1)",
        ));
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), AllocbtError> {
    let value = config.get_double("backtest", "periods_per_year", 252.0);
    if !(value > 0.0 && value.is_finite()) {
        return Err(invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), AllocbtError> {
    match config.get_string("data", "dir") {
        Some(_) => Ok(()),
        None => Err(missing("data", "dir")),
    }
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), AllocbtError> {
    if config.get_list("data", "symbols").is_empty() {
        return Err(missing("data", "symbols"));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), AllocbtError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(invalid(
                "data",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

/// Parse an optional `[data]` date (`YYYY-MM-DD`).
pub fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<Option<NaiveDate>, AllocbtError> {
    match config.get_string("data", field) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    "data",
                    field,
                    &format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

fn validate_kinds(config: &dyn ConfigPort) -> Result<(), AllocbtError> {
    let kinds = config.get_list("strategy", "kinds");
    if kinds.is_empty() {
        return Err(missing("strategy", "kinds"));
    }
    for kind in &kinds {
        let kind = kind.to_lowercase();
        if !KNOWN_STRATEGIES.contains(&kind.as_str()) {
            return Err(AllocbtError::UnknownStrategy { name: kind });
        }
    }
    Ok(())
}

fn validate_momentum(config: &dyn ConfigPort) -> Result<(), AllocbtError> {
    if config.get_int("momentum", "lookback", 5) < 1 {
        return Err(invalid(
            "momentum",
            "lookback",
            "lookback must be at least 1",
        ));
    }
    let quantity = config.get_double("momentum", "quantity", 1.0);
    if !(quantity > 0.0 && quantity.is_finite()) {
        return Err(invalid(
            "momentum",
            "quantity",
            "quantity must be positive",
        ));
    }
    Ok(())
}
