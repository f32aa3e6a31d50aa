//! Strategy contract and the built-in strategies.

use crate::domain::error::AllocbtError;
use crate::domain::frame::FrameView;
use crate::domain::portfolio::dot;
use crate::ports::config_port::ConfigPort;

/// A trading strategy: turns the history seen so far into a per-asset
/// quantity delta (positive buys, negative sells).
///
/// `features` and `prices` end at the current step. `holdings` is the
/// engine's current position, borrowed read-only. The returned vector must
/// have one entry per asset.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    fn iterate(
        &mut self,
        features: FrameView<'_>,
        prices: FrameView<'_>,
        holdings: &[f64],
        capital: f64,
    ) -> Vec<f64>;
}

/// Invests all capital, split evenly across the assets with a positive
/// price, at the first step where it holds nothing, and never trades again.
///
/// The latch is the engine's own holdings: while they are all zero the buy
/// is offered again, so a skipped trade is retried on the next step.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    fee_rate: f64,
}

impl BuyAndHold {
    pub const NAME: &'static str = "BuyAndHold";

    pub fn new(fee_rate: f64) -> Self {
        BuyAndHold { fee_rate }
    }

    /// Quantities whose cost plus fee never exceeds `capital`.
    fn size(&self, prices: &[f64], capital: f64) -> Vec<f64> {
        let tradable = prices.iter().filter(|p| is_tradable(**p)).count();
        if tradable == 0 || !(capital > 0.0) {
            return vec![0.0; prices.len()];
        }

        // Haircut by the fee rate so the purchase plus its fee fits in capital.
        let per_asset = capital / tradable as f64;
        let mut quantities: Vec<f64> = prices
            .iter()
            .map(|&p| {
                if is_tradable(p) {
                    per_asset / p * (1.0 - self.fee_rate)
                } else {
                    0.0
                }
            })
            .collect();

        // Rounding can leave the cost a few ulps above capital; shave until
        // it fits, computing the cost the way the engine does.
        for _ in 0..64 {
            let notional = dot(prices, &quantities);
            if notional + self.fee_rate * notional <= capital {
                return quantities;
            }
            for q in quantities.iter_mut() {
                *q *= 1.0 - 4.0 * f64::EPSILON;
            }
        }
        vec![0.0; prices.len()]
    }
}

fn is_tradable(price: f64) -> bool {
    price > 0.0 && price.is_finite()
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn iterate(
        &mut self,
        _features: FrameView<'_>,
        prices: FrameView<'_>,
        holdings: &[f64],
        capital: f64,
    ) -> Vec<f64> {
        let invested = holdings.iter().any(|h| *h != 0.0);
        match prices.last_row() {
            Some(current) if !invested => self.size(current, capital),
            _ => vec![0.0; holdings.len()],
        }
    }
}

/// Buys `quantity` of an asset whose price is above its price `lookback`
/// steps ago and sells `quantity` when it is below.
#[derive(Debug, Clone)]
pub struct Momentum {
    lookback: usize,
    quantity: f64,
}

impl Momentum {
    pub const NAME: &'static str = "Momentum";

    pub fn new(lookback: usize, quantity: f64) -> Self {
        Momentum { lookback, quantity }
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn iterate(
        &mut self,
        _features: FrameView<'_>,
        prices: FrameView<'_>,
        holdings: &[f64],
        _capital: f64,
    ) -> Vec<f64> {
        let n = prices.len();
        if n <= self.lookback {
            return vec![0.0; holdings.len()];
        }
        let (Some(now), Some(then)) = (prices.row(n - 1), prices.row(n - 1 - self.lookback))
        else {
            return vec![0.0; holdings.len()];
        };

        now.iter()
            .zip(then)
            .map(|(now, then)| {
                if now > then {
                    self.quantity
                } else if now < then {
                    -self.quantity
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// Build a strategy from its configured kind.
///
/// Parameters for `momentum` come from the `[momentum]` section.
pub fn build_strategy(
    kind: &str,
    config: &dyn ConfigPort,
    fee_rate: f64,
) -> Result<Box<dyn Strategy>, AllocbtError> {
    match kind.trim().to_lowercase().as_str() {
        "buy_and_hold" => Ok(Box::new(BuyAndHold::new(fee_rate))),
        "momentum" => {
            let lookback = config.get_int("momentum", "lookback", 5);
            let quantity = config.get_double("momentum", "quantity", 1.0);
            if lookback <= 0 {
                return Err(AllocbtError::ConfigInvalid {
                    section: "momentum".into(),
                    key: "lookback".into(),
                    reason: "lookback must be positive".into(),
                });
            }
            if !(quantity > 0.0 && quantity.is_finite()) {
                return Err(AllocbtError::ConfigInvalid {
                    section: "momentum".into(),
                    key: "quantity".into(),
                    reason: "quantity must be positive".into(),
                });
            }
            Ok(Box::new(Momentum::new(lookback as usize, quantity)))
        }
        other => Err(AllocbtError::UnknownStrategy {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::frame::Frame;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn price_frame(rows: Vec<Vec<f64>>) -> Frame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let width = rows[0].len();
        Frame::new(
            (0..rows.len())
                .map(|i| start + chrono::Duration::days(i as i64))
                .collect(),
            (0..width).map(|i| format!("A{i}")).collect(),
            rows,
        )
        .unwrap()
    }

    #[test]
    fn buy_and_hold_buys_once() {
        let frame = price_frame(vec![vec![100.0, 50.0], vec![110.0, 55.0]]);
        let mut s = BuyAndHold::new(0.0);

        let first = s.iterate(frame.prefix(1), frame.prefix(1), &[0.0, 0.0], 10_000.0);
        assert_relative_eq!(first[0], 50.0);
        assert_relative_eq!(first[1], 100.0);

        let second = s.iterate(frame.prefix(2), frame.prefix(2), &first, 0.0);
        assert_eq!(second, vec![0.0, 0.0]);
    }

    #[test]
    fn buy_and_hold_leaves_room_for_fee() {
        let frame = price_frame(vec![vec![100.0]]);
        let mut s = BuyAndHold::new(0.01);
        let alloc = s.iterate(frame.prefix(1), frame.prefix(1), &[0.0], 100_000.0);
        let notional = alloc[0] * 100.0;
        let fee = 0.01 * notional;
        assert!(notional + fee <= 100_000.0);
        assert_relative_eq!(alloc[0], 990.0);
    }

    #[test]
    fn buy_and_hold_retries_until_holdings_appear() {
        let frame = price_frame(vec![vec![100.0], vec![100.0]]);
        let mut s = BuyAndHold::new(0.0);
        let first = s.iterate(frame.prefix(1), frame.prefix(1), &[0.0], 1_000.0);
        // The engine skipped the trade: still nothing held, so it buys again.
        let second = s.iterate(frame.prefix(2), frame.prefix(2), &[0.0], 1_000.0);
        assert_eq!(first, second);
        assert_relative_eq!(second[0], 10.0);
    }

    #[test]
    fn buy_and_hold_cost_never_exceeds_capital() {
        for cents in [111, 133, 157, 199, 1_111, 3_337, 99_999] {
            let price = cents as f64 / 100.0;
            let frame = price_frame(vec![vec![price, price * 3.0]]);
            for fee_rate in [0.0, 0.004] {
                let mut s = BuyAndHold::new(fee_rate);
                let alloc = s.iterate(frame.prefix(1), frame.prefix(1), &[0.0, 0.0], 100_000.0);
                let notional = dot(frame.row(0), &alloc);
                assert!(notional + fee_rate * notional <= 100_000.0, "price {price}");
                assert!(notional > 99_000.0, "price {price}");
            }
        }
    }

    #[test]
    fn buy_and_hold_skips_unpriced_assets() {
        let frame = price_frame(vec![vec![0.0, 10.0, f64::NAN, -1.0]]);
        let mut s = BuyAndHold::new(0.0);
        let alloc = s.iterate(frame.prefix(1), frame.prefix(1), &[0.0; 4], 1_000.0);
        assert_eq!(alloc[0], 0.0);
        assert_relative_eq!(alloc[1], 100.0, max_relative = 1e-12);
        assert_eq!(alloc[2], 0.0);
        assert_eq!(alloc[3], 0.0);
    }

    #[test]
    fn buy_and_hold_waits_when_nothing_is_priced() {
        let frame = price_frame(vec![vec![0.0, 0.0]]);
        let mut s = BuyAndHold::new(0.0);
        assert_eq!(
            s.iterate(frame.prefix(1), frame.prefix(1), &[0.0, 0.0], 1_000.0),
            vec![0.0, 0.0]
        );
    }

    #[test]
    fn momentum_waits_for_lookback() {
        let frame = price_frame(vec![vec![10.0], vec![11.0], vec![12.0]]);
        let mut s = Momentum::new(2, 3.0);
        assert_eq!(
            s.iterate(frame.prefix(2), frame.prefix(2), &[0.0], 1_000.0),
            vec![0.0]
        );
        assert_eq!(
            s.iterate(frame.prefix(3), frame.prefix(3), &[0.0], 1_000.0),
            vec![3.0]
        );
    }

    #[test]
    fn momentum_sells_falling_assets() {
        let frame = price_frame(vec![vec![10.0, 5.0, 7.0], vec![9.0, 6.0, 7.0]]);
        let mut s = Momentum::new(1, 2.0);
        assert_eq!(
            s.iterate(frame.prefix(2), frame.prefix(2), &[0.0; 3], 1_000.0),
            vec![-2.0, 2.0, 0.0]
        );
    }

    #[test]
    fn build_known_kinds() {
        let config =
            FileConfigAdapter::from_string("[momentum]\nlookback = 3\nquantity = 2\n").unwrap();
        assert_eq!(
            build_strategy("buy_and_hold", &config, 0.004).unwrap().name(),
            BuyAndHold::NAME
        );
        assert_eq!(
            build_strategy(" Momentum ", &config, 0.004).unwrap().name(),
            Momentum::NAME
        );
    }

    #[test]
    fn build_unknown_kind() {
        let config = FileConfigAdapter::from_string("").unwrap();
        let err = build_strategy("martingale", &config, 0.0).err().unwrap();
        assert!(matches!(err, AllocbtError::UnknownStrategy { name } if name == "martingale"));
    }

    #[test]
    fn build_momentum_rejects_bad_lookback() {
        let config = FileConfigAdapter::from_string("[momentum]\nlookback = 0\n").unwrap();
        let err = build_strategy("momentum", &config, 0.0).err().unwrap();
        assert!(matches!(err, AllocbtError::ConfigInvalid { key, .. } if key == "lookback"));
    }
}
