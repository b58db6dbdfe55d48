//! Local-volatility shape function.
//!
//! The local volatility at a grid node is the expiry ATM volatility times a
//! smile shape evaluated at `u = N(z)`, where `z` is the node's log
//! distance from the forward measured in ATM standard deviations. The
//! shape is the quartic through the five values
//!
//! ```text
//! u = 0.10 : a0 - a1 + a2 + a3 - a4
//! u = 0.25 : a0 - a1 + a2
//! u = 0.50 : a0
//! u = 0.75 : a0 + a1 + a2
//! u = 0.90 : a0 + a1 + a2 + a3 + a4
//! ```
//!
//! and, outside `[0.1, 0.9]`, a quadratic matching value and slope at the
//! nearer end so the wings cannot blow up.

use fxsmile_curves::LocalVolCoefficients;
use fxsmile_math::distributions::fast_normal_cdf;

/// Inverse Vandermonde matrix of the pillars 0.1, 0.25, 0.5, 0.75, 0.9.
const PILLAR_INVERSE: [[f64; 5]; 5] = [
    [2.7043269, -2.7692308, 1.6875, -0.9230769, 0.3004808],
    [-22.8365385, 40.0, -27.75, 15.7948718, -5.2083333],
    [65.3044872, -140.7179487, 127.75, -79.1794872, 26.8429487],
    [-76.9230769, 184.6153846, -200.0, 143.5897436, -51.2820513],
    [32.0512821, -82.0512821, 100.0, -82.0512821, 32.0512821],
];

const LOWER_EDGE: f64 = 0.1;
const UPPER_EDGE: f64 = 0.9;

/// Quartic smile shape with quadratic wings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalVolShape {
    poly: [f64; 5],
}

impl LocalVolShape {
    /// Shape of one coefficient set.
    pub fn new(c: &LocalVolCoefficients) -> Self {
        let values = [
            c.a0 - c.a1 + c.a2 + c.a3 - c.a4,
            c.a0 - c.a1 + c.a2,
            c.a0,
            c.a0 + c.a1 + c.a2,
            c.a0 + c.a1 + c.a2 + c.a3 + c.a4,
        ];
        let mut poly = [0.0; 5];
        for (row, out) in PILLAR_INVERSE.iter().zip(poly.iter_mut()) {
            *out = row.iter().zip(values.iter()).map(|(r, v)| r * v).sum();
        }
        Self { poly }
    }

    fn quartic(&self, u: f64) -> f64 {
        let p = &self.poly;
        p[0] + u * (p[1] + u * (p[2] + u * (p[3] + u * p[4])))
    }

    fn slope(&self, u: f64) -> f64 {
        let p = &self.poly;
        p[1] + u * (2.0 * p[2] + u * (3.0 * p[3] + u * 4.0 * p[4]))
    }

    /// Shape at `u` in `[0, 1]`.
    pub fn evaluate(&self, u: f64) -> f64 {
        if u < LOWER_EDGE {
            // a + c u^2 with zero slope at u = 0
            let g = self.quartic(LOWER_EDGE);
            let c = self.slope(LOWER_EDGE) / (2.0 * LOWER_EDGE);
            g - c * LOWER_EDGE * LOWER_EDGE + c * u * u
        } else if u > UPPER_EDGE {
            // a + b u + c u^2 with zero slope at u = 1
            let g = self.quartic(UPPER_EDGE);
            let c = -self.slope(UPPER_EDGE) / (2.0 * (1.0 - UPPER_EDGE));
            let b = -2.0 * c;
            let a = g - UPPER_EDGE * UPPER_EDGE * c - UPPER_EDGE * b;
            a + b * u + c * u * u
        } else {
            self.quartic(u)
        }
    }

    /// Local volatility at standardised moneyness `z`, floored at 0.
    pub fn local_vol(&self, atm_vol: f64, z: f64) -> f64 {
        (atm_vol * self.evaluate(fast_normal_cdf(z))).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn skewed() -> LocalVolCoefficients {
        LocalVolCoefficients {
            a0: 1.02,
            a1: -0.08,
            a2: 0.05,
            a3: 0.01,
            a4: 0.02,
            vol_of_vol: 0.0,
            mean_reversion: 0.0,
        }
    }

    #[test]
    fn test_flat_coefficients_give_unit_shape() {
        let shape = LocalVolShape::new(&LocalVolCoefficients::FLAT);
        for u in [0.0, 0.05, 0.3, 0.5, 0.8, 0.95, 1.0] {
            assert_relative_eq!(shape.evaluate(u), 1.0, epsilon = 1e-6);
        }
        assert_relative_eq!(shape.local_vol(0.12, 0.3), 0.12, epsilon = 1e-6);
    }

    #[test]
    fn test_passes_through_pillars() {
        let c = skewed();
        let shape = LocalVolShape::new(&c);
        assert_relative_eq!(shape.evaluate(0.5), c.a0, epsilon = 1e-5);
        assert_relative_eq!(shape.evaluate(0.25), c.a0 - c.a1 + c.a2, epsilon = 1e-5);
        assert_relative_eq!(
            shape.evaluate(0.9),
            c.a0 + c.a1 + c.a2 + c.a3 + c.a4,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_wings_are_continuous() {
        let shape = LocalVolShape::new(&skewed());
        let below = shape.evaluate(LOWER_EDGE - 1e-9);
        let above = shape.evaluate(LOWER_EDGE + 1e-9);
        assert_relative_eq!(below, above, epsilon = 1e-6);

        let below = shape.evaluate(UPPER_EDGE - 1e-9);
        let above = shape.evaluate(UPPER_EDGE + 1e-9);
        assert_relative_eq!(below, above, epsilon = 1e-6);
    }

    #[test]
    fn test_floor_at_zero() {
        let c = LocalVolCoefficients {
            a0: -0.5,
            ..LocalVolCoefficients::FLAT
        };
        let shape = LocalVolShape::new(&c);
        assert_eq!(shape.local_vol(0.1, 0.0), 0.0);
    }
}
