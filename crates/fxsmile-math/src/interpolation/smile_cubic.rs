//! Local cubic smile interpolation.

use crate::error::{MathError, MathResult};
use crate::interpolation::Interpolator;

/// Behaviour outside the pillar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmileExtrapolation {
    /// Flat at both ends.
    Flat,
    /// Continue the end quadratics at both ends.
    #[default]
    Extrapolate,
    /// Flat before the first pillar, quadratic after the last.
    FlatStartExtrapolateEnd,
    /// Quadratic before the first pillar, flat after the last.
    ExtrapolateStartFlatEnd,
}

impl SmileExtrapolation {
    fn flat_start(self) -> bool {
        matches!(self, Self::Flat | Self::FlatStartExtrapolateEnd)
    }

    fn flat_end(self) -> bool {
        matches!(self, Self::Flat | Self::ExtrapolateStartFlatEnd)
    }
}

/// Piecewise cubic interpolation through smile pillars.
///
/// Interior segments use the cubic through the segment endpoints whose
/// slopes are the averages of the neighbouring chord slopes (a local
/// Hermite form, so moving one pillar only changes nearby segments). The
/// first and last segments, and any extrapolation, use a quadratic that
/// matches the inner endpoint value and slope and passes through the outer
/// pillar. With two pillars the interpolation is linear and clamped.
///
/// # Example
///
/// ```rust
/// use fxsmile_math::interpolation::{Interpolator, SmileCubic};
///
/// // vol by call delta: 10C, 25C, ATM, 25P, 10P
/// let smile = SmileCubic::new(
///     vec![0.10, 0.25, 0.50, 0.75, 0.90],
///     vec![0.125, 0.110, 0.100, 0.105, 0.115],
/// )
/// .unwrap();
///
/// assert!((smile.interpolate(0.50).unwrap() - 0.100).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct SmileCubic {
    xs: Vec<f64>,
    ys: Vec<f64>,
    extrapolation: SmileExtrapolation,
}

impl SmileCubic {
    /// Creates a new smile interpolator.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than 2 points, if the lengths
    /// differ, or if the x values are not strictly increasing.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> MathResult<Self> {
        if xs.len() < 2 {
            return Err(MathError::insufficient_data(2, xs.len()));
        }
        if xs.len() != ys.len() {
            return Err(MathError::dimension_mismatch(xs.len(), ys.len()));
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MathError::invalid_input(
                "x values must be strictly increasing",
            ));
        }

        Ok(Self {
            xs,
            ys,
            extrapolation: SmileExtrapolation::default(),
        })
    }

    /// Sets the extrapolation behaviour.
    #[must_use]
    pub fn with_extrapolation(mut self, extrapolation: SmileExtrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    /// Averaged slope at pillar `i` from its two neighbouring chords.
    fn pillar_slope(&self, i: usize) -> f64 {
        let left = (self.ys[i] - self.ys[i - 1]) / (self.xs[i] - self.xs[i - 1]);
        let right = (self.ys[i + 1] - self.ys[i]) / (self.xs[i + 1] - self.xs[i]);
        0.5 * (left + right)
    }

    /// Quadratic anchored at pillar `centre` (value and averaged slope) and
    /// passing through pillar `outer`.
    fn quadratic(&self, centre: usize, outer: usize, x: f64) -> f64 {
        let slope = self.pillar_slope(centre);
        let (x1, y1) = (self.xs[centre], self.ys[centre]);
        let tx = x1 - self.xs[outer];
        let ty = y1 - self.ys[outer];
        let curvature = (slope - ty / tx) / tx;
        let dx = x - x1;
        y1 + dx * (slope + curvature * dx)
    }

    /// Cubic on the segment `[xs[i-1], xs[i]]`.
    fn cubic(&self, i: usize, x: f64) -> f64 {
        let (x1, x2) = (self.xs[i - 1], self.xs[i]);
        let (y1, y2) = (self.ys[i - 1], self.ys[i]);
        let h = x2 - x1;
        let chord = (y2 - y1) / h;
        let p1 = 0.5 * ((y1 - self.ys[i - 2]) / (x1 - self.xs[i - 2]) + chord);
        let p2 = 0.5 * (chord + (self.ys[i + 1] - y2) / (self.xs[i + 1] - x2));

        let t = (x - x1) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        h00 * y1 + h10 * h * p1 + h01 * y2 + h11 * h * p2
    }
}

impl Interpolator for SmileCubic {
    fn interpolate(&self, x: f64) -> MathResult<f64> {
        let n = self.xs.len();

        if n == 2 {
            let (x0, x1) = (self.xs[0], self.xs[1]);
            let (y0, y1) = (self.ys[0], self.ys[1]);
            return Ok(if x <= x0 {
                y0
            } else if x >= x1 {
                y1
            } else {
                y0 + (y1 - y0) * (x - x0) / (x1 - x0)
            });
        }

        // First pillar at or beyond x
        let i = self.xs.iter().position(|&xi| xi >= x).unwrap_or(n);

        let value = if i <= 1 {
            if i == 0 && self.extrapolation.flat_start() {
                self.ys[0]
            } else {
                self.quadratic(1, 0, x)
            }
        } else if i >= n - 1 {
            if i == n && self.extrapolation.flat_end() {
                self.ys[n - 1]
            } else {
                self.quadratic(n - 2, n - 1, x)
            }
        } else {
            self.cubic(i, x)
        };

        Ok(value)
    }

    fn min_x(&self) -> f64 {
        self.xs[0]
    }

    fn max_x(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn pillars() -> (Vec<f64>, Vec<f64>) {
        (
            vec![0.10, 0.25, 0.50, 0.75, 0.90],
            vec![0.125, 0.110, 0.100, 0.105, 0.115],
        )
    }

    #[test]
    fn test_passes_through_pillars() {
        let (xs, ys) = pillars();
        let smile = SmileCubic::new(xs.clone(), ys.clone()).unwrap();

        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_relative_eq!(smile.interpolate(*x).unwrap(), *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_flat_smile_stays_flat() {
        let xs = vec![0.10, 0.25, 0.50, 0.75, 0.90];
        let smile = SmileCubic::new(xs, vec![0.2; 5]).unwrap();

        for x in [0.0, 0.05, 0.3, 0.6, 0.95, 1.0] {
            assert_relative_eq!(smile.interpolate(x).unwrap(), 0.2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_flat_extrapolation() {
        let (xs, ys) = pillars();
        let smile = SmileCubic::new(xs, ys)
            .unwrap()
            .with_extrapolation(SmileExtrapolation::Flat);

        assert_relative_eq!(smile.interpolate(0.01).unwrap(), 0.125);
        assert_relative_eq!(smile.interpolate(0.99).unwrap(), 0.115);
    }

    #[test]
    fn test_quadratic_reproduced_exactly() {
        // Chord-averaged slopes are exact for parabolas on a uniform grid
        let xs: Vec<f64> = (0..5).map(|i| f64::from(i) * 0.25).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.1 + 0.2 * (x - 0.5) * (x - 0.5)).collect();
        let smile = SmileCubic::new(xs, ys).unwrap();

        for x in [0.1, 0.3, 0.6, 0.8, 1.1] {
            let expected = 0.1 + 0.2 * (x - 0.5) * (x - 0.5);
            assert_relative_eq!(smile.interpolate(x).unwrap(), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_two_points_linear_clamped() {
        let smile = SmileCubic::new(vec![0.0, 1.0], vec![1.0, 3.0]).unwrap();

        assert_relative_eq!(smile.interpolate(0.5).unwrap(), 2.0);
        assert_relative_eq!(smile.interpolate(-1.0).unwrap(), 1.0);
        assert_relative_eq!(smile.interpolate(2.0).unwrap(), 3.0);
    }

    #[test]
    fn test_rejects_unsorted() {
        assert!(SmileCubic::new(vec![0.5, 0.25, 0.75], vec![0.1; 3]).is_err());
    }

    proptest! {
        #[test]
        fn prop_interior_within_neighbour_envelope(x in 0.25f64..0.75) {
            let (xs, ys) = pillars();
            let smile = SmileCubic::new(xs, ys).unwrap();
            let v = smile.interpolate(x).unwrap();
            prop_assert!(v > 0.09 && v < 0.12);
        }
    }
}
