//! Piecewise-linear utility curves.
//!
//! Every strategy sub-score maps a raw market quantity (a discount
//! percentage, a transaction count, a yield) onto a 0-100 utility scale.
//! A `Ramp` holds the breakpoints of one such curve and interpolates
//! linearly between them, clamping at both ends.

/// A piecewise-linear curve over `(x, score)` breakpoints.
///
/// Breakpoints must be sorted by `x`. Inputs below the first breakpoint
/// take the first score; inputs above the last take the last score.
#[derive(Debug, Clone)]
pub struct Ramp {
    points: &'static [(f64, f64)],
}

impl Ramp {
    pub const fn new(points: &'static [(f64, f64)]) -> Self {
        Self { points }
    }

    /// Evaluates the curve at `x`.
    pub fn score(&self, x: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if x <= first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }
        for pair in self.points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if x <= x1 {
                let t = (x - x0) / (x1 - x0);
                return y0 + t * (y1 - y0);
            }
        }
        last.1
    }
}

/// Utility of a percentage discount against the baseline median.
pub const DISCOUNT_RAMP: Ramp = Ramp::new(&[(0.0, 0.0), (10.0, 50.0), (20.0, 75.0), (30.0, 100.0)]);

/// Utility of the 30-day transaction count in the candidate's scope.
pub const LIQUIDITY_RAMP: Ramp = Ramp::new(&[(0.0, 0.0), (5.0, 50.0), (10.0, 75.0), (20.0, 100.0)]);

/// Utility of baseline momentum. Strongly negative momentum scores zero,
/// +10% or better scores full marks.
pub const MOMENTUM_RAMP: Ramp = Ramp::new(&[(-0.05, 0.0), (0.10, 100.0)]);

/// Utility of a gross rental yield.
pub const YIELD_RAMP: Ramp = Ramp::new(&[(0.04, 0.0), (0.06, 50.0), (0.08, 100.0)]);

/// Utility of price stability. Low volatility scores high; the curve
/// decays to zero as the coefficient of variation approaches 0.30.
pub const STABILITY_RAMP: Ramp = Ramp::new(&[(0.05, 100.0), (0.30, 0.0)]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_breakpoints() {
        assert_eq!(DISCOUNT_RAMP.score(5.0), 25.0);
        assert_eq!(DISCOUNT_RAMP.score(15.0), 62.5);
        assert_eq!(DISCOUNT_RAMP.score(25.0), 87.5);
    }

    #[test]
    fn clamps_outside_domain() {
        assert_eq!(DISCOUNT_RAMP.score(-3.0), 0.0);
        assert_eq!(DISCOUNT_RAMP.score(55.0), 100.0);
        assert_eq!(STABILITY_RAMP.score(0.01), 100.0);
        assert_eq!(STABILITY_RAMP.score(0.9), 0.0);
    }

    #[test]
    fn hits_breakpoints_exactly() {
        assert_eq!(LIQUIDITY_RAMP.score(5.0), 50.0);
        assert_eq!(LIQUIDITY_RAMP.score(10.0), 75.0);
        assert_eq!(YIELD_RAMP.score(0.06), 50.0);
    }

    #[test]
    fn stability_decreases_with_volatility() {
        assert!(STABILITY_RAMP.score(0.08) > STABILITY_RAMP.score(0.20));
    }
}
