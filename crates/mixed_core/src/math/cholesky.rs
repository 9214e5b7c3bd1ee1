//! Dense Cholesky factorisation for small symmetric positive-definite systems.
//!
//! Random-effects Hessians in the models handled here are small enough that a
//! dense `L L^T` factor is adequate for Newton steps, log-determinants and
//! the implicit-function corrections.

use crate::sparsity::SparseMatrix;
use crate::types::CoreError;

/// Lower-triangular Cholesky factor `A = L L^T`, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Cholesky {
    n: usize,
    l: Vec<f64>,
}

impl Cholesky {
    /// Factor a dense row-major `n x n` matrix. Only the lower triangle is read.
    ///
    /// # Errors
    /// - `CoreError::DimensionMismatch` if `a.len() != n * n`
    /// - `CoreError::NotPositiveDefinite` on a non-positive (or non-finite) pivot
    pub fn factor(a: &[f64], n: usize) -> Result<Self, CoreError> {
        if a.len() != n * n {
            return Err(CoreError::DimensionMismatch {
                context: "cholesky matrix",
                expected: n * n,
                got: a.len(),
            });
        }
        let mut l = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                let mut sum = a[i * n + j];
                for k in 0..j {
                    sum -= l[i * n + k] * l[j * n + k];
                }
                if i == j {
                    if !(sum > 0.0 && sum.is_finite()) {
                        return Err(CoreError::NotPositiveDefinite { pivot: i });
                    }
                    l[i * n + i] = sum.sqrt();
                } else {
                    l[i * n + j] = sum / l[j * n + j];
                }
            }
        }
        Ok(Self { n, l })
    }

    /// Factor a symmetric matrix given by its lower triangle in coordinate form.
    ///
    /// Entries above the diagonal are mirrored, so either triangle may be
    /// supplied.
    pub fn factor_sparse(a: &SparseMatrix, n: usize) -> Result<Self, CoreError> {
        let mut dense = vec![0.0; n * n];
        for (r, c, v) in a.triplets() {
            if r >= n || c >= n {
                return Err(CoreError::InvalidInput(format!(
                    "entry ({}, {}) outside {} x {} matrix",
                    r, c, n, n
                )));
            }
            let (i, j) = if r >= c { (r, c) } else { (c, r) };
            dense[i * n + j] += v;
        }
        Self::factor(&dense, n)
    }

    /// Dimension.
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Solve `A x = b`.
    ///
    /// # Errors
    /// `CoreError::DimensionMismatch` if `b` has the wrong length.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>, CoreError> {
        let n = self.n;
        if b.len() != n {
            return Err(CoreError::DimensionMismatch {
                context: "cholesky right-hand side",
                expected: n,
                got: b.len(),
            });
        }
        // L y = b
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut sum = b[i];
            for j in 0..i {
                sum -= self.l[i * n + j] * y[j];
            }
            y[i] = sum / self.l[i * n + i];
        }
        // L^T x = y
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = y[i];
            for j in (i + 1)..n {
                sum -= self.l[j * n + i] * x[j];
            }
            x[i] = sum / self.l[i * n + i];
        }
        Ok(x)
    }

    /// `ln det A = 2 * sum(ln L_ii)`.
    pub fn log_det(&self) -> f64 {
        (0..self.n).map(|i| self.l[i * self.n + i].ln()).sum::<f64>() * 2.0
    }

    /// Dense row-major inverse of `A`.
    pub fn inverse(&self) -> Vec<f64> {
        let n = self.n;
        let mut inv = vec![0.0; n * n];
        let mut e = vec![0.0; n];
        for k in 0..n {
            e.iter_mut().for_each(|v| *v = 0.0);
            e[k] = 1.0;
            // length checked by construction
            if let Ok(col) = self.solve(&e) {
                for (i, v) in col.into_iter().enumerate() {
                    inv[i * n + k] = v;
                }
            }
        }
        inv
    }
}
