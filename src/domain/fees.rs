//! Proportional transaction fees.

use super::portfolio::dot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeModel {
    pub enabled: bool,
    pub fee_rate: f64,
}

impl FeeModel {
    pub fn new(enabled: bool, fee_rate: f64) -> Self {
        FeeModel { enabled, fee_rate }
    }

    /// Fee on the gross traded notional: `fee_rate * dot(prices, |allocation|)`.
    ///
    /// Buys and sells both pay. Zero when fees are disabled.
    pub fn fee(&self, prices: &[f64], allocation: &[f64]) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        let gross: Vec<f64> = allocation.iter().map(|a| a.abs()).collect();
        self.fee_rate * dot(prices, &gross)
    }
}
