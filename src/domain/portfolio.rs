//! Portfolio state: cash plus per-asset holdings.

/// Dot product of two equally sized vectors.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub capital: f64,
    pub holdings: Vec<f64>,
}

impl PortfolioState {
    /// Fresh state for one run: all capital in cash, nothing held.
    pub fn new(initial_capital: f64, asset_count: usize) -> Self {
        PortfolioState {
            capital: initial_capital,
            holdings: vec![0.0; asset_count],
        }
    }

    pub fn total_value(&self, prices: &[f64]) -> f64 {
        dot(prices, &self.holdings) + self.capital
    }

    /// Pay `asking` out of capital and add `allocation` to holdings.
    pub fn execute(&mut self, allocation: &[f64], asking: f64) {
        self.capital -= asking;
        for (held, delta) in self.holdings.iter_mut().zip(allocation) {
            *held += delta;
        }
    }
}
