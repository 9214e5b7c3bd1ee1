//! Optimisation-layer error types.
//!
//! Internal helpers of the Laplace model and the NLP adapter return
//! `Result<_, OptimiserError>`; the solver-facing callbacks convert failures
//! to `false` after logging them.

use mixed_ad::AdError;
use mixed_core::types::CoreError;
use thiserror::Error;

/// Errors raised by the Laplace model, its configuration and the NLP adapter.
///
/// # Variants
///
/// - `ContractViolation`: sizes or sparsity structures disagree between calls
/// - `ProfileFailure`: the random-effects optimisation did not converge
/// - `NonFinite`: an objective, gradient or Hessian value is not finite
/// - `InvalidInput`: bad bounds, starting values or configuration
/// - `InvalidState`: a callback arrived in the wrong adapter state
/// - `EvaluationFailed`: a problem callback reported failure
/// - `Ad` / `Core`: wrapped lower-layer errors
///
/// # Examples
///
/// ```
/// use mixed_optimiser::OptimiserError;
///
/// let err = OptimiserError::ProfileFailure {
///     iterations: 50,
///     gradient_norm: 1e-3,
/// };
/// assert!(format!("{}", err).contains("50 iterations"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimiserError {
    /// Sizes or sparsity structures disagree with what was established.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Newton iteration on the random effects failed.
    #[error("Random effects did not converge after {iterations} iterations: |grad|_inf = {gradient_norm}")]
    ProfileFailure {
        /// Iterations performed
        iterations: usize,
        /// Infinity norm of the random-effects gradient at the last iterate
        gradient_norm: f64,
    },

    /// A value that must be finite is not.
    #[error("Non-finite value in {context}")]
    NonFinite {
        /// Where the value was produced
        context: &'static str,
    },

    /// Invalid bounds, starting values or configuration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not allowed in the current adapter state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A problem callback returned `false`.
    #[error("Callback {callback} failed")]
    EvaluationFailed {
        /// Name of the failing callback
        callback: &'static str,
    },

    /// Error from the differentiation layer.
    #[error(transparent)]
    Ad(#[from] AdError),

    /// Error from the foundation layer.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl OptimiserError {
    pub(crate) fn size(context: &str, expected: usize, got: usize) -> Self {
        OptimiserError::ContractViolation(format!(
            "{}: expected length {}, got {}",
            context, expected, got
        ))
    }
}
