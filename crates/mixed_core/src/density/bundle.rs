//! Accumulation of residuals into a log-density and its objective form.

use super::residual::Residual;
use crate::types::Scalar;

/// Running sum of residual log-densities.
///
/// Holds the smooth accumulator and, in push order, the sub-terms whose
/// absolute values are subtracted. The total log-density is
/// `smooth - sum(|sub_abs_i|)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualBundle<S> {
    smooth: S,
    sub_abs: Vec<S>,
}

impl<S: Scalar> Default for ResidualBundle<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Scalar> ResidualBundle<S> {
    /// Empty bundle.
    pub fn new() -> Self {
        Self {
            smooth: S::zero(),
            sub_abs: Vec::new(),
        }
    }

    /// Add a residual. Only Laplace-family residuals append a sub-term.
    pub fn push(&mut self, residual: &Residual<S>) {
        self.smooth = self.smooth + residual.logden_smooth;
        if residual.density.is_nonsmooth() {
            self.sub_abs.push(residual.logden_sub_abs);
        }
    }

    /// Add a smooth log-density contribution with no residual attached.
    pub fn add_smooth(&mut self, value: S) {
        self.smooth = self.smooth + value;
    }

    /// Smooth accumulator.
    pub fn smooth(&self) -> S {
        self.smooth
    }

    /// Absolute-value sub-terms in push order.
    pub fn sub_abs(&self) -> &[S] {
        &self.sub_abs
    }

    /// `smooth - sum(|sub_abs_i|)`.
    pub fn log_density(&self) -> S {
        self.sub_abs
            .iter()
            .fold(self.smooth, |acc, &term| acc - term.abs())
    }

    /// Convert to objective (negative log-density) form.
    pub fn into_terms(self) -> DensityTerms<S> {
        DensityTerms {
            smooth: -self.smooth,
            abs: self.sub_abs,
        }
    }
}

impl<S: Scalar> Extend<Residual<S>> for ResidualBundle<S> {
    fn extend<I: IntoIterator<Item = Residual<S>>>(&mut self, iter: I) {
        for residual in iter {
            self.push(&residual);
        }
    }
}

/// Objective-form density `smooth + sum(|abs_i|)`.
///
/// This is the negative of a log-density: minimising it maximises the
/// density. The flat vector form `[smooth, abs_1, ..., abs_k]` is what the
/// prior evaluator reports.
///
/// # Examples
/// ```
/// use mixed_core::density::DensityTerms;
///
/// let terms = DensityTerms::new(1.5_f64, vec![-2.0, 0.5]);
/// assert_eq!(terms.value(), 4.0);
/// assert_eq!(terms.to_vec(), vec![1.5, -2.0, 0.5]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DensityTerms<S> {
    /// Smooth part.
    pub smooth: S,
    /// Arguments of the absolute-value terms.
    pub abs: Vec<S>,
}

impl<S: Scalar> DensityTerms<S> {
    /// Construct from parts.
    pub fn new(smooth: S, abs: Vec<S>) -> Self {
        Self { smooth, abs }
    }

    /// Purely smooth terms.
    pub fn smooth_only(smooth: S) -> Self {
        Self {
            smooth,
            abs: Vec::new(),
        }
    }

    /// Number of absolute-value terms.
    pub fn n_abs(&self) -> usize {
        self.abs.len()
    }

    /// `smooth + sum(|abs_i|)`.
    pub fn value(&self) -> S {
        self.abs.iter().fold(self.smooth, |acc, &a| acc + a.abs())
    }

    /// Flat vector `[smooth, abs_1, ..., abs_k]`.
    pub fn to_vec(&self) -> Vec<S> {
        let mut out = Vec::with_capacity(1 + self.abs.len());
        out.push(self.smooth);
        out.extend_from_slice(&self.abs);
        out
    }

    /// Append the terms of `other`, summing smooth parts.
    pub fn append(&mut self, other: DensityTerms<S>) {
        self.smooth = self.smooth + other.smooth;
        self.abs.extend(other.abs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::{residual_density, DensityKind, ResidualMode};
    use approx::assert_relative_eq;

    fn residual(kind: DensityKind, y: f64) -> Residual<f64> {
        residual_density(0.0, y, 0.0, 1.0, kind, 0.0, 0, ResidualMode::Value)
    }

    #[test]
    fn test_only_laplace_family_adds_sub_terms() {
        let mut bundle = ResidualBundle::new();
        bundle.push(&residual(DensityKind::Gaussian, 0.5));
        bundle.push(&residual(DensityKind::Laplace, -1.0));
        bundle.push(&residual(DensityKind::Uniform, 3.0));
        assert_eq!(bundle.sub_abs().len(), 1);
        assert_relative_eq!(bundle.sub_abs()[0], -(2.0_f64.sqrt()));
    }

    #[test]
    fn test_log_density_matches_sum_of_residuals() {
        let rs = [
            residual(DensityKind::Gaussian, 0.3),
            residual(DensityKind::Laplace, -0.7),
            residual(DensityKind::Laplace, 1.1),
        ];
        let mut bundle = ResidualBundle::new();
        bundle.extend(rs.iter().copied());
        let direct: f64 = rs.iter().map(|r| r.log_density()).sum();
        assert_relative_eq!(bundle.log_density(), direct, epsilon = 1e-12);
    }

    #[test]
    fn test_into_terms_negates() {
        let mut bundle = ResidualBundle::new();
        bundle.push(&residual(DensityKind::Laplace, 2.0));
        let log_density = bundle.log_density();
        let terms = bundle.into_terms();
        assert_relative_eq!(terms.value(), -log_density, epsilon = 1e-12);
        assert_eq!(terms.n_abs(), 1);
    }

    #[test]
    fn test_append_terms() {
        let mut a = DensityTerms::new(1.0, vec![2.0]);
        a.append(DensityTerms::new(0.5, vec![-1.0, 3.0]));
        assert_eq!(a.smooth, 1.5);
        assert_eq!(a.abs, vec![2.0, -1.0, 3.0]);
        assert_eq!(DensityTerms::smooth_only(2.0).value(), 2.0);
    }
}
