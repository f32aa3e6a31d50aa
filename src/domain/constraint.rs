//! Per-asset clamping of a proposed allocation.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintPolicy {
    pub allow_short_position: bool,
}

impl ConstraintPolicy {
    pub fn new(allow_short_position: bool) -> Self {
        ConstraintPolicy {
            allow_short_position,
        }
    }

    /// Clamp `allocation` in place, one asset at a time.
    ///
    /// - With `capital <= 0` any sell is dropped to zero.
    /// - Otherwise, without shorting, a sell larger than the holding is cut
    ///   down to close the position exactly.
    ///
    /// There is no netting between assets.
    pub fn apply(&self, allocation: &mut [f64], holdings: &[f64], capital: f64) {
        for (delta, held) in allocation.iter_mut().zip(holdings) {
            // NOTE: insolvency blocks sells here, not buys. That may be the
            // inverse of the intended risk rule, but it is kept as is until
            // the intent is settled.
            if capital <= 0.0 && *delta < 0.0 {
                *delta = 0.0;
            } else if held + *delta < 0.0 && !self.allow_short_position {
                *delta = -held;
            }
        }
    }
}
