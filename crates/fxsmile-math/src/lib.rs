//! # fxsmile Math
//!
//! Numerical building blocks for the fxsmile local-volatility engine.
//!
//! This crate provides:
//!
//! - **Solvers**: Bracketed bisection and Newton-Raphson root finding
//! - **Linear Algebra**: Tridiagonal LU factorisation and Gauss-Jordan
//!   elimination with full pivoting
//! - **Interpolation**: The piecewise cubic smile interpolator used to read
//!   volatilities off five delta pillars
//! - **Distributions**: Standard normal CDF/PDF/inverse and the fast
//!   polynomial CDF used inside the PDE grid
//!
//! ## Design Philosophy
//!
//! - **Explicit outcomes**: iteration exhaustion is reported, never hidden
//! - **No allocation in hot loops**: factorisations are reusable buffers

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::suboptimal_flops)]

pub mod distributions;
pub mod error;
pub mod interpolation;
pub mod linear_algebra;
pub mod solvers;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::distributions::{fast_normal_cdf, normal_cdf, normal_inverse_cdf, normal_pdf};
    pub use crate::error::{MathError, MathResult};
    pub use crate::interpolation::{Interpolator, SmileCubic, SmileExtrapolation};
    pub use crate::linear_algebra::{gauss_jordan, TridiagonalLu};
    pub use crate::solvers::{
        bisection, newton_raphson, SolverConfig, SolverResult, SolverStatus,
    };
}

pub use error::{MathError, MathResult};
