//! Collaborator contracts consumed by the NLP adapter.

use crate::error::OptimiserError;
use mixed_core::density::DensityTerms;
use mixed_core::sparsity::SparseMatrix;
use mixed_core::types::Scalar;

/// Prior density of the fixed effects in objective form.
///
/// `eval` returns `[smooth, abs_1 … abs_k]` terms whose value is
/// `smooth + Σ|abs_i|`. The number of abs terms must not depend on the point.
pub trait FixedPrior {
    /// Number of fixed effects.
    fn n_fixed(&self) -> usize;

    /// Objective-form prior terms at `fixed`.
    fn eval<S: Scalar>(&self, fixed: &[S]) -> DensityTerms<S>;
}

impl<P: FixedPrior + ?Sized> FixedPrior for &P {
    fn n_fixed(&self) -> usize {
        (**self).n_fixed()
    }

    fn eval<S: Scalar>(&self, fixed: &[S]) -> DensityTerms<S> {
        (**self).eval(fixed)
    }
}

/// Everything the fixed-effects NLP needs from a mixed-effects model.
///
/// Sparse results use coordinate form; each method's pattern must be the
/// same at every point. Methods take `&mut self` so implementations can keep
/// recordings and established patterns between calls.
pub trait MixedModel {
    /// Number of fixed effects `θ`.
    fn n_fixed(&self) -> usize;

    /// Number of random effects `u`.
    fn n_random(&self) -> usize;

    /// Prior terms `[smooth, abs_1 … abs_k]` at `fixed`.
    fn prior_eval(&mut self, fixed: &[f64]) -> Result<Vec<f64>, OptimiserError>;

    /// Jacobian of [`MixedModel::prior_eval`] with respect to `θ`.
    fn prior_jac(&mut self, fixed: &[f64]) -> Result<SparseMatrix, OptimiserError>;

    /// Lower triangle of the Hessian of `Σ_k w_k prior_k(θ)`.
    ///
    /// `weights` has length `1 + k`.
    fn prior_hes(&mut self, fixed: &[f64], weights: &[f64]) -> Result<SparseMatrix, OptimiserError>;

    /// Random effects minimising `f(θ, ·)`, starting from `random_start`.
    fn optimize_random(&mut self, fixed: &[f64], random_start: &[f64]) -> Result<Vec<f64>, OptimiserError>;

    /// Laplace objective with the log-determinant taken at `fixed_model` and
    /// the joint density at `fixed_point`.
    fn laplace_eval(
        &mut self,
        fixed_model: &[f64],
        fixed_point: &[f64],
        random: &[f64],
    ) -> Result<f64, OptimiserError>;

    /// Total derivative in `θ` of the Laplace objective along the profiled
    /// random effects `random = û(θ)`.
    fn laplace_grad_fix(&mut self, fixed: &[f64], random: &[f64]) -> Result<Vec<f64>, OptimiserError>;

    /// Lower triangle of the Hessian in `θ` of the Laplace objective.
    fn laplace_hes_fix(&mut self, fixed: &[f64], random: &[f64]) -> Result<SparseMatrix, OptimiserError>;
}
