//! Bisection root-finding algorithm.

use crate::error::{MathError, MathResult};
use crate::solvers::{SolverConfig, SolverResult, SolverStatus};

/// Bisection root-finding algorithm.
///
/// Repeatedly halves the bracket, keeping the half whose endpoints have
/// opposite signs. Stops when the bracket is narrower than
/// `config.tolerance` or the midpoint is an exact root.
///
/// Requires: `f(a) * f(b) <= 0` (opposite signs at endpoints)
///
/// # Returns
///
/// The root and iteration statistics. When `config.max_iterations` is
/// reached the midpoint of the final bracket is returned with
/// [`SolverStatus::IterationsExhausted`].
///
/// # Errors
///
/// [`MathError::InvalidBracket`] if the endpoints do not bracket a root.
///
/// # Example
///
/// ```rust
/// use fxsmile_math::solvers::{bisection, SolverConfig};
///
/// let f = |x: f64| x * x - 2.0;
///
/// let result = bisection(f, 1.0, 2.0, &SolverConfig::default()).unwrap();
/// assert!((result.root - std::f64::consts::SQRT_2).abs() < 1e-9);
/// ```
pub fn bisection<F>(f: F, a: f64, b: f64, config: &SolverConfig) -> MathResult<SolverResult>
where
    F: Fn(f64) -> f64,
{
    let mut lo = a.min(b);
    let mut hi = a.max(b);

    let mut f_lo = f(lo);
    let f_hi = f(hi);

    if f_lo * f_hi > 0.0 || f_lo.is_nan() || f_hi.is_nan() {
        return Err(MathError::InvalidBracket {
            a: lo,
            b: hi,
            fa: f_lo,
            fb: f_hi,
        });
    }

    // Handle case where endpoint is the root
    if f_lo == 0.0 {
        return Ok(SolverResult {
            root: lo,
            iterations: 0,
            residual: f_lo,
            status: SolverStatus::Converged,
        });
    }
    if f_hi == 0.0 {
        return Ok(SolverResult {
            root: hi,
            iterations: 0,
            residual: f_hi,
            status: SolverStatus::Converged,
        });
    }

    for iteration in 0..config.max_iterations {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);

        if f_mid == 0.0 || (hi - lo) < config.tolerance {
            return Ok(SolverResult {
                root: mid,
                iterations: iteration + 1,
                residual: f_mid,
                status: SolverStatus::Converged,
            });
        }

        if f_mid * f_lo < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }

    let mid = 0.5 * (lo + hi);
    log::debug!(
        "bisection exhausted {} iterations, bracket width {:.3e}",
        config.max_iterations,
        hi - lo
    );
    Ok(SolverResult {
        root: mid,
        iterations: config.max_iterations,
        residual: f(mid),
        status: SolverStatus::IterationsExhausted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sqrt_2() {
        let f = |x: f64| x * x - 2.0;

        let result = bisection(f, 1.0, 2.0, &SolverConfig::default()).unwrap();

        assert!(result.converged());
        assert_relative_eq!(result.root, std::f64::consts::SQRT_2, epsilon = 1e-9);
    }

    #[test]
    fn test_reversed_bracket() {
        let f = |x: f64| x * x - 2.0;

        let result = bisection(f, 2.0, 1.0, &SolverConfig::default()).unwrap();

        assert_relative_eq!(result.root, std::f64::consts::SQRT_2, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_bracket() {
        let f = |x: f64| x * x - 2.0;

        let result = bisection(f, 2.0, 3.0, &SolverConfig::default());

        assert!(matches!(result, Err(MathError::InvalidBracket { .. })));
    }

    #[test]
    fn test_root_at_endpoint() {
        let f = |x: f64| x - 1.0;

        let result = bisection(f, 0.0, 1.0, &SolverConfig::default()).unwrap();

        assert_relative_eq!(result.root, 1.0);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let f = |x: f64| x - 0.3;
        let config = SolverConfig::new(1e-14, 5);

        let result = bisection(f, 0.0, 1.0, &config).unwrap();

        assert_eq!(result.status, SolverStatus::IterationsExhausted);
        assert_eq!(result.iterations, 5);
        // Five halvings leave a bracket of width 1/32 around the root
        assert!((result.root - 0.3).abs() < 1.0 / 32.0);
    }
}
