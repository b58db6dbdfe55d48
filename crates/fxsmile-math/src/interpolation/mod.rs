//! Interpolation methods for volatility smiles.
//!
//! - [`SmileCubic`]: local cubic through five (or more) smile pillars,
//!   quadratic on the two end segments and beyond

mod smile_cubic;

pub use smile_cubic::{SmileCubic, SmileExtrapolation};

use crate::error::MathResult;

/// Trait for interpolation methods.
pub trait Interpolator: Send + Sync {
    /// Returns the interpolated value at x.
    fn interpolate(&self, x: f64) -> MathResult<f64>;

    /// Returns the minimum x value in the data.
    fn min_x(&self) -> f64;

    /// Returns the maximum x value in the data.
    fn max_x(&self) -> f64;

    /// Checks if x is within the interpolation range.
    fn in_range(&self, x: f64) -> bool {
        x >= self.min_x() && x <= self.max_x()
    }
}
