//! Coordinate-format sparsity patterns and sparse matrices.

use crate::types::CoreError;
use std::collections::BTreeSet;

/// Set of unique `(row, col)` positions, stored as parallel index arrays.
///
/// Entry order is significant: value arrays reported against a pattern use
/// the same order, and evaluators must keep it stable across calls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SparsityPattern {
    rows: Vec<usize>,
    cols: Vec<usize>,
}

impl SparsityPattern {
    /// Create a pattern from parallel row and column arrays.
    ///
    /// # Errors
    /// - `CoreError::DimensionMismatch` if the arrays differ in length
    /// - `CoreError::InvalidInput` if a position appears twice
    pub fn new(rows: Vec<usize>, cols: Vec<usize>) -> Result<Self, CoreError> {
        if rows.len() != cols.len() {
            return Err(CoreError::DimensionMismatch {
                context: "sparsity pattern rows/cols",
                expected: rows.len(),
                got: cols.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for (&r, &c) in rows.iter().zip(cols.iter()) {
            if !seen.insert((r, c)) {
                return Err(CoreError::InvalidInput(format!(
                    "duplicate sparsity entry ({}, {})",
                    r, c
                )));
            }
        }
        Ok(Self { rows, cols })
    }

    /// Create a pattern from `(row, col)` pairs.
    pub fn from_pairs<I: IntoIterator<Item = (usize, usize)>>(pairs: I) -> Result<Self, CoreError> {
        let (rows, cols) = pairs.into_iter().unzip();
        Self::new(rows, cols)
    }

    /// Empty pattern.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Lower triangle (including the diagonal) of a dense `n x n` matrix,
    /// row-major.
    pub fn dense_lower(n: usize) -> Self {
        let mut rows = Vec::with_capacity(n * (n + 1) / 2);
        let mut cols = Vec::with_capacity(n * (n + 1) / 2);
        for i in 0..n {
            for j in 0..=i {
                rows.push(i);
                cols.push(j);
            }
        }
        Self { rows, cols }
    }

    /// Build from arrays already known to be unique.
    pub(crate) fn from_unique(rows: Vec<usize>, cols: Vec<usize>) -> Self {
        debug_assert_eq!(rows.len(), cols.len());
        Self { rows, cols }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row indices.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Column indices.
    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Iterate `(row, col)` pairs in entry order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }

    /// Entry index of `(row, col)`, if present.
    pub fn position(&self, row: usize, col: usize) -> Option<usize> {
        self.iter().position(|p| p == (row, col))
    }

    /// True if every entry has `row >= col`.
    pub fn is_lower_triangular(&self) -> bool {
        self.iter().all(|(r, c)| r >= c)
    }

    /// Largest row index plus one (zero when empty).
    pub fn row_extent(&self) -> usize {
        self.rows.iter().max().map_or(0, |&m| m + 1)
    }

    /// Largest column index plus one (zero when empty).
    pub fn col_extent(&self) -> usize {
        self.cols.iter().max().map_or(0, |&m| m + 1)
    }
}

/// Sparse matrix in coordinate format.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    pattern: SparsityPattern,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Attach values to a pattern.
    ///
    /// # Errors
    /// `CoreError::DimensionMismatch` if `values` does not match the pattern length.
    pub fn new(pattern: SparsityPattern, values: Vec<f64>) -> Result<Self, CoreError> {
        if pattern.len() != values.len() {
            return Err(CoreError::DimensionMismatch {
                context: "sparse matrix values",
                expected: pattern.len(),
                got: values.len(),
            });
        }
        Ok(Self { pattern, values })
    }

    /// Sparsity pattern.
    pub fn pattern(&self) -> &SparsityPattern {
        &self.pattern
    }

    /// Values in entry order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Row indices.
    pub fn rows(&self) -> &[usize] {
        self.pattern.rows()
    }

    /// Column indices.
    pub fn cols(&self) -> &[usize] {
        self.pattern.cols()
    }

    /// Number of entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterate `(row, col, value)` triplets.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.pattern
            .iter()
            .zip(self.values.iter().copied())
            .map(|((r, c), v)| (r, c, v))
    }

    /// Split into pattern and values.
    pub fn into_parts(self) -> (SparsityPattern, Vec<f64>) {
        (self.pattern, self.values)
    }

    /// Dense `nrows x ncols` row-major copy.
    ///
    /// With `symmetric` set, each off-diagonal entry is mirrored, treating the
    /// matrix as one triangle of a symmetric matrix.
    pub fn to_dense(&self, nrows: usize, ncols: usize, symmetric: bool) -> Vec<f64> {
        let mut dense = vec![0.0; nrows * ncols];
        for (r, c, v) in self.triplets() {
            dense[r * ncols + c] += v;
            if symmetric && r != c {
                dense[c * ncols + r] += v;
            }
        }
        dense
    }
}
