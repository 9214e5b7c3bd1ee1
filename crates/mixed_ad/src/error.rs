//! Error types for the differentiation layer.

use mixed_core::types::CoreError;
use thiserror::Error;

/// Errors raised while recording or evaluating derivatives.
///
/// # Examples
/// ```
/// use mixed_ad::AdError;
///
/// let err = AdError::ContractViolation("random Hessian sparsity changed".to_string());
/// assert!(format!("{}", err).starts_with("Contract violation"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdError {
    /// Model structure changed between calls, or inputs have the wrong size.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// A derivative or function value is not finite.
    #[error("Non-finite value in {context}")]
    NonFinite {
        /// Where the value was produced
        context: &'static str,
    },

    /// Error from the foundation layer.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AdError {
    /// Size mismatch between an input and what the model expects.
    pub(crate) fn size(context: &str, expected: usize, got: usize) -> Self {
        AdError::ContractViolation(format!(
            "{}: expected length {}, got {}",
            context, expected, got
        ))
    }
}
