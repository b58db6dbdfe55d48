//! Gauss-Jordan elimination with full pivoting.

use crate::error::{MathError, MathResult};
use nalgebra::{DMatrix, DVector};

/// Solves `A x = b` by Gauss-Jordan elimination with full pivoting.
///
/// On success `a` is replaced by its inverse and `b` by the solution.
/// Each step picks the largest remaining element over all unused rows and
/// columns, so the elimination is stable for the badly scaled Jacobians a
/// smile calibration produces.
///
/// # Errors
///
/// - [`MathError::DimensionMismatch`] if `a` is not square or `b` has the
///   wrong length
/// - [`MathError::SingularMatrix`] if no non-zero pivot is left
pub fn gauss_jordan(a: &mut DMatrix<f64>, b: &mut DVector<f64>) -> MathResult<()> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(MathError::dimension_mismatch(n, a.ncols()));
    }
    if b.len() != n {
        return Err(MathError::dimension_mismatch(n, b.len()));
    }

    let mut used = vec![false; n];
    let mut row_of = vec![0usize; n];
    let mut col_of = vec![0usize; n];

    for step in 0..n {
        let mut big = 0.0;
        let mut pivot = None;
        for j in 0..n {
            if used[j] {
                continue;
            }
            for k in 0..n {
                if !used[k] && a[(j, k)].abs() >= big {
                    big = a[(j, k)].abs();
                    pivot = Some((j, k));
                }
            }
        }

        let Some((irow, icol)) = pivot else {
            return Err(MathError::SingularMatrix { row: step });
        };
        used[icol] = true;

        if irow != icol {
            a.swap_rows(irow, icol);
            b.swap_rows(irow, icol);
        }
        row_of[step] = irow;
        col_of[step] = icol;

        let p = a[(icol, icol)];
        if p == 0.0 || p.is_nan() {
            return Err(MathError::SingularMatrix { row: step });
        }

        let pivinv = 1.0 / p;
        a[(icol, icol)] = 1.0;
        for k in 0..n {
            a[(icol, k)] *= pivinv;
        }
        b[icol] *= pivinv;

        for r in 0..n {
            if r == icol {
                continue;
            }
            let factor = a[(r, icol)];
            a[(r, icol)] = 0.0;
            for k in 0..n {
                a[(r, k)] -= a[(icol, k)] * factor;
            }
            b[r] -= b[icol] * factor;
        }
    }

    // Undo the column interchanges on the inverse
    for step in (0..n).rev() {
        if row_of[step] != col_of[step] {
            a.swap_columns(row_of[step], col_of[step]);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solves_dense_system() {
        let m = DMatrix::from_row_slice(
            3,
            3,
            &[2.0, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0],
        );
        let mut a = m.clone();
        let mut b = DVector::from_vec(vec![8.0, -11.0, -3.0]);

        gauss_jordan(&mut a, &mut b).unwrap();

        assert_relative_eq!(b[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(b[1], 3.0, epsilon = 1e-12);
        assert_relative_eq!(b[2], -1.0, epsilon = 1e-12);

        let identity = &m * &a;
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(identity[(i, j)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_needs_pivoting() {
        // Zero in the leading position
        let mut a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let mut b = DVector::from_vec(vec![3.0, 4.0]);

        gauss_jordan(&mut a, &mut b).unwrap();

        assert_relative_eq!(b[0], 4.0);
        assert_relative_eq!(b[1], 3.0);
    }

    #[test]
    fn test_singular_matrix() {
        let mut a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let mut b = DVector::from_vec(vec![1.0, 2.0]);

        let result = gauss_jordan(&mut a, &mut b);

        assert!(matches!(result, Err(MathError::SingularMatrix { .. })));
    }
}
