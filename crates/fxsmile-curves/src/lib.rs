//! # fxsmile Curves
//!
//! Term structures for the fxsmile local-volatility engine.
//!
//! This crate provides:
//!
//! - **[`Curve`]**: time-indexed pillars read with flat-step, linear or
//!   linear-in-variance interpolation
//! - **[`CoefficientCurves`]**: the seven per-tenor local-volatility
//!   coefficient curves the calibrator writes and the pricer reads
//! - **[`MarketSmile`]**: per-tenor FX smile quotes (rates, ATM, risk
//!   reversals, butterflies, speed) and the curves derived from them
//!
//! ## Quick Start
//!
//! ```rust
//! use fxsmile_curves::prelude::*;
//!
//! let atm = Curve::new(vec![0.25, 1.0], vec![0.10, 0.12]).unwrap();
//!
//! assert!((atm.interpolate_linear(0.625) - 0.11).abs() < 1e-12);
//! assert!((atm.interpolate_flat(0.5) - 0.12).abs() < 1e-12);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod coefficients;
pub mod curve;
pub mod error;
pub mod market;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::coefficients::{CoefficientCurves, LocalVolCoefficients};
    pub use crate::curve::{Curve, CurveInterpolation};
    pub use crate::error::{CurveError, CurveResult};
    pub use crate::market::{MarketSmile, SmileQuote};
}

pub use coefficients::{CoefficientCurves, LocalVolCoefficients};
pub use curve::{Curve, CurveInterpolation};
pub use error::{CurveError, CurveResult};
pub use market::{MarketSmile, SmileQuote};
