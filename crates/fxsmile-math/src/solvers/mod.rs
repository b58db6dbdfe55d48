//! Root-finding algorithms.
//!
//! - [`bisection`]: bracketing method used for delta-to-strike inversion.
//!   Running out of iterations is not an error: the best estimate is
//!   returned with [`SolverStatus::IterationsExhausted`] so callers decide.
//! - [`newton_raphson`]: quadratic convergence when a derivative is
//!   available; used for implied volatility.
//!
//! # Example
//!
//! ```rust
//! use fxsmile_math::solvers::{bisection, SolverConfig, SolverStatus};
//!
//! let result = bisection(|x: f64| x * x - 2.0, 1.0, 2.0, &SolverConfig::default()).unwrap();
//! assert_eq!(result.status, SolverStatus::Converged);
//! assert!((result.root - std::f64::consts::SQRT_2).abs() < 1e-9);
//! ```

mod bisection;
mod newton;

pub use bisection::bisection;
pub use newton::newton_raphson;

/// Default tolerance for root-finding algorithms.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Default maximum iterations for root-finding algorithms.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Configuration for root-finding algorithms.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Tolerance for convergence.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SolverConfig {
    /// Creates a new solver configuration.
    #[must_use]
    pub fn new(tolerance: f64, max_iterations: u32) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Sets the tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// How a root search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// The tolerance was met.
    Converged,
    /// The iteration budget ran out; the root is the best estimate so far.
    IterationsExhausted,
}

/// Result of a root-finding iteration.
#[derive(Debug, Clone, Copy)]
pub struct SolverResult {
    /// The root found (or best estimate).
    pub root: f64,
    /// Number of iterations used.
    pub iterations: u32,
    /// Final residual (function value at root).
    pub residual: f64,
    /// Whether the tolerance was met.
    pub status: SolverStatus,
}

impl SolverResult {
    /// Returns true if the tolerance was met.
    pub fn converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }
}
