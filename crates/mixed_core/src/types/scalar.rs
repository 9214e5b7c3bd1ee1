//! Scalar abstraction shared by every density evaluation.
//!
//! Densities are written once, generically over [`Scalar`], and then
//! evaluated with plain `f64`, with num-dual numbers (first order, nested or
//! hyper-dual) for derivatives, or with a tape variable to produce a
//! recording of the computation.
//!
//! ## Usage
//!
//! ```
//! use mixed_core::types::Scalar;
//!
//! fn half_square<S: Scalar>(x: S) -> S {
//!     x * x / S::from_f64(2.0)
//! }
//!
//! assert_eq!(half_square(3.0_f64), 4.5);
//! ```
//!
//! With `num-dual-mode` enabled the same function differentiates:
//!
//! ```
//! # #[cfg(feature = "num-dual-mode")]
//! # {
//! use mixed_core::types::Scalar;
//! use num_dual::Dual64;
//!
//! fn half_square<S: Scalar>(x: S) -> S {
//!     x * x / S::from_f64(2.0)
//! }
//!
//! let y = half_square(Dual64::new(3.0, 1.0));
//! assert_eq!(y.re, 4.5);
//! assert_eq!(y.eps, 3.0);
//! # }
//! ```

use num_traits::{One, Zero};
use std::fmt::Debug;
use std::ops::{Div, Neg, Sub};

/// Arithmetic required of a value flowing through a density evaluation.
///
/// Addition, multiplication and the identities come from
/// [`num_traits::Zero`] and [`num_traits::One`]; the remaining operations are
/// the ones the residual densities and the joint/prior densities need.
pub trait Scalar:
    Copy + Debug + Zero + One + Sub<Output = Self> + Div<Output = Self> + Neg<Output = Self>
{
    /// Lift a constant into the scalar type (zero derivative parts).
    fn from_f64(value: f64) -> Self;

    /// Real part of the scalar, i.e. the function value without derivatives.
    fn value(&self) -> f64;

    /// Exponential.
    fn exp(self) -> Self;

    /// Natural logarithm.
    fn ln(self) -> Self;

    /// Square root.
    fn sqrt(self) -> Self;

    /// Absolute value.
    ///
    /// At zero the derivative of the positive branch is used.
    fn abs(self) -> Self;

    /// Derivative of [`Scalar::abs`]: `-1` below zero, `+1` otherwise.
    ///
    /// Piecewise constant, so every derivative part is zero. Types that
    /// record operations override this to keep the sign data-dependent.
    fn sign(self) -> Self {
        Self::from_f64(if self.value() < 0.0 { -1.0 } else { 1.0 })
    }

    /// Integer power.
    fn powi(self, n: i32) -> Self;
}

impl Scalar for f64 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn value(&self) -> f64 {
        *self
    }

    #[inline]
    fn exp(self) -> Self {
        f64::exp(self)
    }

    #[inline]
    fn ln(self) -> Self {
        f64::ln(self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }
}

#[cfg(feature = "num-dual-mode")]
mod dual_impls {
    use super::Scalar;
    use num_dual::{Dual, DualNum, HyperDual};

    impl<T: DualNum<f64> + Copy> Scalar for Dual<T, f64> {
        #[inline]
        fn from_f64(value: f64) -> Self {
            Self::from(value)
        }

        #[inline]
        fn value(&self) -> f64 {
            DualNum::re(self)
        }

        #[inline]
        fn exp(self) -> Self {
            DualNum::exp(&self)
        }

        #[inline]
        fn ln(self) -> Self {
            DualNum::ln(&self)
        }

        #[inline]
        fn sqrt(self) -> Self {
            DualNum::sqrt(&self)
        }

        #[inline]
        fn abs(self) -> Self {
            if DualNum::re(&self) < 0.0 {
                -self
            } else {
                self
            }
        }

        #[inline]
        fn powi(self, n: i32) -> Self {
            DualNum::powi(&self, n)
        }
    }

    impl<T: DualNum<f64> + Copy> Scalar for HyperDual<T, f64> {
        #[inline]
        fn from_f64(value: f64) -> Self {
            Self::from(value)
        }

        #[inline]
        fn value(&self) -> f64 {
            DualNum::re(self)
        }

        #[inline]
        fn exp(self) -> Self {
            DualNum::exp(&self)
        }

        #[inline]
        fn ln(self) -> Self {
            DualNum::ln(&self)
        }

        #[inline]
        fn sqrt(self) -> Self {
            DualNum::sqrt(&self)
        }

        #[inline]
        fn abs(self) -> Self {
            if DualNum::re(&self) < 0.0 {
                -self
            } else {
                self
            }
        }

        #[inline]
        fn powi(self, n: i32) -> Self {
            DualNum::powi(&self, n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn log_gaussian_kernel<S: Scalar>(x: S, mu: f64, sigma: f64) -> S {
        let wres = (x - S::from_f64(mu)) / S::from_f64(sigma);
        -(wres * wres) / S::from_f64(2.0)
    }

    fn zero_plus_one<S: Scalar>() -> S {
        S::zero() + S::one()
    }

    #[test]
    fn test_f64_operations() {
        assert_relative_eq!(Scalar::exp(1.0_f64), std::f64::consts::E);
        assert_relative_eq!(Scalar::ln(std::f64::consts::E), 1.0);
        assert_relative_eq!(Scalar::sqrt(9.0_f64), 3.0);
        assert_eq!(Scalar::abs(-2.5_f64), 2.5);
        assert_eq!(Scalar::powi(2.0_f64, 3), 8.0);
        assert_eq!(Scalar::sign(-3.0_f64), -1.0);
        assert_eq!(Scalar::sign(0.0_f64), 1.0);
        assert_eq!(zero_plus_one::<f64>(), 1.0);
    }

    #[test]
    fn test_generic_kernel_with_f64() {
        let v = log_gaussian_kernel(3.0_f64, 1.0, 2.0);
        assert_relative_eq!(v, -0.5);
    }

    #[cfg(feature = "num-dual-mode")]
    mod dual_tests {
        use super::*;
        use num_dual::{Dual, Dual64, HyperDual64};

        #[test]
        fn test_dual_first_derivative() {
            // d/dx [-(x - 1)^2 / 8] at x = 3 is -(3 - 1) / 4
            let v = log_gaussian_kernel(Dual64::new(3.0, 1.0), 1.0, 2.0);
            assert_relative_eq!(v.re, -0.5);
            assert_relative_eq!(v.eps, -0.5);
        }

        #[test]
        fn test_hyperdual_second_derivative() {
            let x = HyperDual64::new(3.0, 1.0, 1.0, 0.0);
            let v = log_gaussian_kernel(x, 1.0, 2.0);
            assert_relative_eq!(v.eps1eps2, -0.25);
        }

        #[test]
        fn test_nested_dual_second_derivative() {
            // Outer and inner directions both along x.
            let x: Dual<Dual64, f64> = Dual::new(Dual64::new(2.0, 1.0), Dual64::new(1.0, 0.0));
            let y = Scalar::ln(x);
            // d2/dx2 ln(x) = -1/x^2
            assert_relative_eq!(y.eps.eps, -0.25);
            assert_relative_eq!(y.value(), 2.0_f64.ln());
        }

        #[test]
        fn test_abs_derivative_sign() {
            let neg = Scalar::abs(Dual64::new(-2.0, 1.0));
            assert_eq!(neg.re, 2.0);
            assert_eq!(neg.eps, -1.0);
            let pos = Scalar::abs(Dual64::new(2.0, 1.0));
            assert_eq!(pos.eps, 1.0);
        }

        #[test]
        fn test_sign_has_no_derivative() {
            let s = Scalar::sign(Dual64::new(-0.5, 1.0));
            assert_eq!((s.re, s.eps), (-1.0, 0.0));
            let s = Scalar::sign(Dual64::new(0.0, 1.0));
            assert_eq!((s.re, s.eps), (1.0, 0.0));
        }
    }
}
