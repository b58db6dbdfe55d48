//! Linear algebra utilities.
//!
//! - [`TridiagonalLu`]: reusable LU factorisation of a tridiagonal matrix,
//!   the inner kernel of every Crank-Nicolson step
//! - [`gauss_jordan`]: dense elimination with full pivoting for the small
//!   Newton systems of the calibrator

mod gauss_jordan;
mod tridiagonal;

pub use gauss_jordan::gauss_jordan;
pub use tridiagonal::TridiagonalLu;
