//! Market data access port.
//!
//! Implementations stand in for the market data gateway. The backtest core
//! never calls a port; tables are loaded up front and handed to the engine.

use crate::domain::error::AllocbtError;
use chrono::{NaiveDate, NaiveDateTime};

pub trait DataPort {
    /// Closing prices for `symbol` between `start` and `end` (inclusive,
    /// either bound optional), sorted by timestamp.
    fn fetch_closes(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<(NaiveDateTime, f64)>, AllocbtError>;

    fn list_symbols(&self) -> Result<Vec<String>, AllocbtError>;
}
