//! Tridiagonal LU factorisation.

use crate::error::{MathError, MathResult};

const PIVOT_FLOOR: f64 = 1e-300;

/// LU factorisation of a tridiagonal matrix, kept for repeated solves.
///
/// Row `i` of the matrix is `sub[i] * x[i-1] + diag[i] * x[i] + sup[i] * x[i+1]`;
/// `sub[0]` and `sup[n-1]` are ignored. The buffers are reused across
/// factorisations so a PDE sweep allocates once.
///
/// # Example
///
/// ```rust
/// use fxsmile_math::linear_algebra::TridiagonalLu;
///
/// let mut lu = TridiagonalLu::with_capacity(3);
/// lu.factor(&[0.0, -1.0, -1.0], &[2.0, 2.0, 2.0], &[-1.0, -1.0, 0.0]).unwrap();
///
/// let mut rhs = vec![1.0, 0.0, 1.0];
/// lu.solve_in_place(&mut rhs).unwrap();
/// assert!((rhs[1] - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TridiagonalLu {
    multipliers: Vec<f64>,
    pivots: Vec<f64>,
    upper: Vec<f64>,
}

impl TridiagonalLu {
    /// Creates an empty factorisation with room for `n` rows.
    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        Self {
            multipliers: Vec::with_capacity(n),
            pivots: Vec::with_capacity(n),
            upper: Vec::with_capacity(n),
        }
    }

    /// Number of rows in the current factorisation.
    pub fn len(&self) -> usize {
        self.pivots.len()
    }

    /// Returns true if nothing has been factored yet.
    pub fn is_empty(&self) -> bool {
        self.pivots.is_empty()
    }

    /// Factors the matrix given by its three bands.
    ///
    /// # Errors
    ///
    /// - [`MathError::DimensionMismatch`] if the bands differ in length
    /// - [`MathError::SingularMatrix`] if a pivot vanishes
    pub fn factor(&mut self, sub: &[f64], diag: &[f64], sup: &[f64]) -> MathResult<()> {
        let n = diag.len();
        if sub.len() != n {
            return Err(MathError::dimension_mismatch(n, sub.len()));
        }
        if sup.len() != n {
            return Err(MathError::dimension_mismatch(n, sup.len()));
        }

        self.multipliers.clear();
        self.pivots.clear();
        self.upper.clear();
        if n == 0 {
            return Ok(());
        }

        self.upper.extend_from_slice(sup);
        self.multipliers.push(0.0);
        self.pivots.push(diag[0]);
        if !(diag[0].abs() > PIVOT_FLOOR) {
            return Err(MathError::SingularMatrix { row: 0 });
        }

        for i in 1..n {
            let m = sub[i] / self.pivots[i - 1];
            let pivot = diag[i] - m * sup[i - 1];
            if !(pivot.abs() > PIVOT_FLOOR) {
                return Err(MathError::SingularMatrix { row: i });
            }
            self.multipliers.push(m);
            self.pivots.push(pivot);
        }

        Ok(())
    }

    /// Solves `A x = rhs`, overwriting `rhs` with `x`.
    pub fn solve_in_place(&self, rhs: &mut [f64]) -> MathResult<()> {
        let n = self.pivots.len();
        if rhs.len() != n {
            return Err(MathError::dimension_mismatch(n, rhs.len()));
        }
        if n == 0 {
            return Ok(());
        }

        // Forward substitution
        for i in 1..n {
            rhs[i] -= self.multipliers[i] * rhs[i - 1];
        }

        // Back substitution
        rhs[n - 1] /= self.pivots[n - 1];
        for i in (0..n - 1).rev() {
            rhs[i] = (rhs[i] - self.upper[i] * rhs[i + 1]) / self.pivots[i];
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn solve_tridiagonal(sub: &[f64], diag: &[f64], sup: &[f64], rhs: &[f64]) -> MathResult<Vec<f64>> {
        let mut lu = TridiagonalLu::with_capacity(diag.len());
        lu.factor(sub, diag, sup)?;
        let mut x = rhs.to_vec();
        lu.solve_in_place(&mut x)?;
        Ok(x)
    }

    fn multiply(sub: &[f64], diag: &[f64], sup: &[f64], x: &[f64]) -> Vec<f64> {
        let n = x.len();
        (0..n)
            .map(|i| {
                let mut v = diag[i] * x[i];
                if i > 0 {
                    v += sub[i] * x[i - 1];
                }
                if i + 1 < n {
                    v += sup[i] * x[i + 1];
                }
                v
            })
            .collect()
    }

    #[test]
    fn test_solve_recovers_vector() {
        let sub = [0.0, -0.3, -0.2, -0.4, -0.1];
        let diag = [1.6, 1.7, 1.5, 1.9, 1.4];
        let sup = [-0.5, -0.2, -0.3, -0.6, 0.0];
        let x = [1.0, -2.0, 0.5, 3.0, -1.5];

        let rhs = multiply(&sub, &diag, &sup, &x);
        let solved = solve_tridiagonal(&sub, &diag, &sup, &rhs).unwrap();

        for (a, b) in solved.iter().zip(x.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_factor_reuse() {
        let sub = [0.0, 1.0, 1.0];
        let diag = [4.0, 4.0, 4.0];
        let sup = [1.0, 1.0, 0.0];

        let mut lu = TridiagonalLu::with_capacity(3);
        lu.factor(&sub, &diag, &sup).unwrap();

        for x in [[1.0, 2.0, 3.0], [0.0, -1.0, 0.25]] {
            let mut rhs = multiply(&sub, &diag, &sup, &x);
            lu.solve_in_place(&mut rhs).unwrap();
            for (a, b) in rhs.iter().zip(x.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_singular_pivot() {
        let result = solve_tridiagonal(&[0.0, 1.0], &[1.0, 1.0], &[1.0, 0.0], &[1.0, 1.0]);
        assert!(matches!(result, Err(MathError::SingularMatrix { row: 1 })));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut lu = TridiagonalLu::default();
        assert!(lu.factor(&[0.0], &[1.0, 1.0], &[0.0, 0.0]).is_err());
    }
}
