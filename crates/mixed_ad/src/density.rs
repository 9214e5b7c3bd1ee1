//! Joint density of fixed and random effects.

use mixed_core::density::DensityTerms;
use mixed_core::types::Scalar;

/// Negative log of data likelihood times random-effects prior, as a function
/// of fixed effects `θ` and random effects `u`.
///
/// Implementations are written once, generically over [`Scalar`]; the
/// recorder evaluates them with tape variables and num-dual numbers.
///
/// # Examples
/// ```
/// use mixed_ad::JointDensity;
/// use mixed_core::density::DensityTerms;
/// use mixed_core::types::Scalar;
///
/// /// u ~ N(θ, 1)
/// struct Shrinkage;
///
/// impl JointDensity for Shrinkage {
///     fn n_fixed(&self) -> usize { 1 }
///     fn n_random(&self) -> usize { 1 }
///     fn eval<S: Scalar>(&self, fixed: &[S], random: &[S]) -> DensityTerms<S> {
///         let d = random[0] - fixed[0];
///         DensityTerms::smooth_only(d * d / S::from_f64(2.0))
///     }
/// }
///
/// assert_eq!(Shrinkage.value(&[1.0], &[3.0]), 2.0);
/// ```
pub trait JointDensity {
    /// Number of fixed effects.
    fn n_fixed(&self) -> usize;

    /// Number of random effects.
    fn n_random(&self) -> usize;

    /// Objective-form density terms at `(fixed, random)`.
    fn eval<S: Scalar>(&self, fixed: &[S], random: &[S]) -> DensityTerms<S>;

    /// `f(θ, u) = smooth + sum |abs_i|`.
    fn value<S: Scalar>(&self, fixed: &[S], random: &[S]) -> S {
        self.eval(fixed, random).value()
    }
}

impl<J: JointDensity + ?Sized> JointDensity for &J {
    fn n_fixed(&self) -> usize {
        (**self).n_fixed()
    }

    fn n_random(&self) -> usize {
        (**self).n_random()
    }

    fn eval<S: Scalar>(&self, fixed: &[S], random: &[S]) -> DensityTerms<S> {
        (**self).eval(fixed, random)
    }
}
