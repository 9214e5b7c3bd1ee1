//! Error types for the foundation layer.
//!
//! This module provides:
//! - `CoreError`: Errors from residual construction, sparsity bookkeeping
//!   and dense linear algebra

use thiserror::Error;

/// Errors raised by the foundation layer.
///
/// # Examples
/// ```
/// use mixed_core::types::CoreError;
///
/// let err = CoreError::DimensionMismatch {
///     context: "merge_sparse rows/cols",
///     expected: 3,
///     got: 2,
/// };
/// assert!(format!("{}", err).contains("expected 3, got 2"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Two inputs that must agree in length do not.
    #[error("Dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Where the mismatch was detected
        context: &'static str,
        /// Required length
        expected: usize,
        /// Supplied length
        got: usize,
    },

    /// Density parameters are not admissible for the requested kind.
    #[error("Invalid density parameters: {0}")]
    InvalidDensity(String),

    /// A value that must be finite is not.
    #[error("Non-finite value in {context}")]
    NonFinite {
        /// Where the value was produced
        context: &'static str,
    },

    /// Cholesky factorisation met a non-positive pivot.
    #[error("Matrix not positive definite (pivot {pivot})")]
    NotPositiveDefinite {
        /// Zero-based index of the failing pivot
        pivot: usize,
    },

    /// Any other invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
