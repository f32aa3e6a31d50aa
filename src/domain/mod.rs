//! Core domain types and logic.

pub mod frame;
pub mod portfolio;
pub mod fees;
pub mod constraint;
pub mod strategy;
pub mod backtest;
pub mod runner;
pub mod benchmark;
pub mod metrics;
pub mod config_validation;
pub mod error;
