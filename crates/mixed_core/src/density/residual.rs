//! Residual and log-density evaluation for a single scalar observation.
//!
//! A residual compares one quantity against a named distribution and splits
//! the resulting log-density into a smooth part and, for the Laplace family,
//! a sub-term whose absolute value is subtracted:
//!
//! ```text
//! log-density = logden_smooth - |logden_sub_abs|
//! ```
//!
//! Two modes select what is compared:
//! - [`ResidualMode::Value`]: the quantity `y` against mean `mu`
//! - [`ResidualMode::Difference`]: the difference `z - y` against mean `mu`,
//!   used for age and time smoothing of neighbouring grid values
//!
//! The log variants shift by `eta` before taking logarithms. Their scale
//! depends on the mode: in value mode the standard deviation `delta` is
//! transformed to `ln(mu + eta + delta) - ln(mu + eta)`, in difference mode
//! `delta` is used directly.

use crate::types::{CoreError, Scalar};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// sqrt(2)
const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// ln(sqrt(2 * pi))
const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// Distribution family of a residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DensityKind {
    /// Improper flat density; contributes nothing.
    Uniform,
    /// Normal density.
    Gaussian,
    /// Double-exponential density (non-smooth at its mean).
    Laplace,
    /// Normal density of `ln(x + eta)`.
    LogGaussian,
    /// Laplace density of `ln(x + eta)`.
    LogLaplace,
}

impl DensityKind {
    /// True for the log-transformed families.
    #[inline]
    pub fn is_log(self) -> bool {
        matches!(self, DensityKind::LogGaussian | DensityKind::LogLaplace)
    }

    /// True when the log-density carries an absolute-value term.
    #[inline]
    pub fn is_nonsmooth(self) -> bool {
        matches!(self, DensityKind::Laplace | DensityKind::LogLaplace)
    }

    /// Snake-case name of the family.
    pub fn name(self) -> &'static str {
        match self {
            DensityKind::Uniform => "uniform",
            DensityKind::Gaussian => "gaussian",
            DensityKind::Laplace => "laplace",
            DensityKind::LogGaussian => "log_gaussian",
            DensityKind::LogLaplace => "log_laplace",
        }
    }
}

/// Whether a residual compares a value or a difference of two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ResidualMode {
    /// Compare `y` with `mu`.
    Value,
    /// Compare `z - y` with `mu`.
    Difference,
}

/// Weighted residual together with its log-density split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual<S> {
    /// Standardised residual.
    pub wres: S,
    /// Smooth part of the log-density.
    pub logden_smooth: S,
    /// Term whose absolute value is subtracted from the smooth part.
    /// Zero for smooth families.
    pub logden_sub_abs: S,
    /// Family that produced this residual.
    pub density: DensityKind,
    /// Caller-supplied identifier.
    pub index: usize,
}

impl<S: Scalar> Residual<S> {
    /// Complete log-density `logden_smooth - |logden_sub_abs|`.
    #[inline]
    pub fn log_density(&self) -> S {
        self.logden_smooth - self.logden_sub_abs.abs()
    }
}

/// Evaluate the residual and log-density of one observation.
///
/// # Arguments
/// * `z` - Second value in difference mode (ignored in value mode)
/// * `y` - Observed quantity (first value in difference mode)
/// * `mu` - Mean of the density
/// * `delta` - Standard deviation (before any log transformation)
/// * `density` - Distribution family
/// * `eta` - Offset for the log families (ignored otherwise)
/// * `index` - Identifier copied into the result
/// * `mode` - Value or difference comparison
///
/// The evaluation is total: parameters are not validated here. Use
/// [`Prior::new`] to obtain a validated parameter set.
///
/// # Examples
/// ```
/// use mixed_core::density::{residual_density, DensityKind, ResidualMode};
///
/// let r = residual_density(0.0, 3.0, 1.0, 2.0, DensityKind::Gaussian, 0.0, 7, ResidualMode::Value);
/// assert_eq!(r.wres, 1.0);
/// assert_eq!(r.index, 7);
/// ```
#[allow(clippy::too_many_arguments)]
pub fn residual_density<S: Scalar>(
    z: S,
    y: S,
    mu: S,
    delta: S,
    density: DensityKind,
    eta: S,
    index: usize,
    mode: ResidualMode,
) -> Residual<S> {
    let zero = S::zero();
    if density == DensityKind::Uniform {
        return Residual {
            wres: zero,
            logden_smooth: zero,
            logden_sub_abs: zero,
            density,
            index,
        };
    }

    let (wres, sigma) = match (mode, density.is_log()) {
        (ResidualMode::Difference, false) => ((z - y - mu) / delta, delta),
        (ResidualMode::Difference, true) => {
            let diff = (z + eta).ln() - (y + eta).ln();
            ((diff - mu) / delta, delta)
        }
        (ResidualMode::Value, false) => ((y - mu) / delta, delta),
        (ResidualMode::Value, true) => {
            let sigma = (mu + eta + delta).ln() - (mu + eta).ln();
            (((y + eta).ln() - (mu + eta).ln()) / sigma, sigma)
        }
    };

    let (logden_smooth, logden_sub_abs) = if density.is_nonsmooth() {
        let smooth = -(sigma * S::from_f64(SQRT_2)).ln();
        (smooth, S::from_f64(SQRT_2) * wres)
    } else {
        let smooth = -sigma.ln() - S::from_f64(LN_SQRT_2PI) - wres * wres / S::from_f64(2.0);
        (smooth, zero)
    };

    Residual {
        wres,
        logden_smooth,
        logden_sub_abs,
        density,
        index,
    }
}

/// Validated density parameters attached to a quantity.
///
/// # Examples
/// ```
/// use mixed_core::density::{DensityKind, Prior, ResidualMode};
///
/// let prior = Prior::new(DensityKind::Laplace, 0.0, 0.5, 0.0).unwrap();
/// let r = prior.residual(0.0_f64, 1.0, ResidualMode::Value, 0);
/// assert!((r.logden_sub_abs - 2.0_f64.sqrt() * 2.0).abs() < 1e-12);
///
/// assert!(Prior::new(DensityKind::Gaussian, 0.0, -1.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Prior {
    density: DensityKind,
    mean: f64,
    std: f64,
    eta: f64,
}

impl Prior {
    /// Create a prior, checking that its parameters define a proper density.
    ///
    /// # Errors
    /// `CoreError::InvalidDensity` when `std` is not finite and positive for a
    /// non-uniform family, when `mean` is not finite, or when `eta` is not
    /// finite for a log family.
    pub fn new(density: DensityKind, mean: f64, std: f64, eta: f64) -> Result<Self, CoreError> {
        if density != DensityKind::Uniform {
            if !(std.is_finite() && std > 0.0) {
                return Err(CoreError::InvalidDensity(format!(
                    "{} density requires finite std > 0, got {}",
                    density.name(),
                    std
                )));
            }
            if !mean.is_finite() {
                return Err(CoreError::InvalidDensity(format!(
                    "{} density requires a finite mean, got {}",
                    density.name(),
                    mean
                )));
            }
        }
        if density.is_log() && !eta.is_finite() {
            return Err(CoreError::InvalidDensity(format!(
                "{} density requires a finite eta, got {}",
                density.name(),
                eta
            )));
        }
        Ok(Self {
            density,
            mean,
            std,
            eta,
        })
    }

    /// Flat improper prior.
    pub fn uniform() -> Self {
        Self {
            density: DensityKind::Uniform,
            mean: 0.0,
            std: 0.0,
            eta: 0.0,
        }
    }

    /// Gaussian prior with the given mean and standard deviation.
    pub fn gaussian(mean: f64, std: f64) -> Result<Self, CoreError> {
        Self::new(DensityKind::Gaussian, mean, std, 0.0)
    }

    /// Laplace prior with the given mean and standard deviation.
    pub fn laplace(mean: f64, std: f64) -> Result<Self, CoreError> {
        Self::new(DensityKind::Laplace, mean, std, 0.0)
    }

    /// Distribution family.
    pub fn density(&self) -> DensityKind {
        self.density
    }

    /// Mean.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Standard deviation.
    pub fn std(&self) -> f64 {
        self.std
    }

    /// Log offset.
    pub fn eta(&self) -> f64 {
        self.eta
    }

    /// Evaluate this prior at `y` (value mode) or at `z - y` (difference mode).
    pub fn residual<S: Scalar>(&self, z: S, y: S, mode: ResidualMode, index: usize) -> Residual<S> {
        residual_density(
            z,
            y,
            S::from_f64(self.mean),
            S::from_f64(self.std),
            self.density,
            S::from_f64(self.eta),
            index,
            mode,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    // ========================================
    // Value mode
    // ========================================

    #[test]
    fn test_gaussian_value_closed_form() {
        let (y, mu, delta) = (1.3, 0.4, 0.7);
        let r = residual_density(0.0, y, mu, delta, DensityKind::Gaussian, 0.0, 3, ResidualMode::Value);
        let wres = (y - mu) / delta;
        assert_relative_eq!(r.wres, wres, epsilon = 1e-14);
        assert_relative_eq!(
            r.logden_smooth,
            -(delta * (2.0 * PI).sqrt()).ln() - wres * wres / 2.0,
            epsilon = 1e-12
        );
        assert_eq!(r.logden_sub_abs, 0.0);
        assert_eq!(r.index, 3);
        assert_eq!(r.density, DensityKind::Gaussian);
    }

    #[test]
    fn test_laplace_value_closed_form() {
        let (y, mu, delta) = (-0.2, 0.5, 0.25);
        let r = residual_density(0.0, y, mu, delta, DensityKind::Laplace, 0.0, 0, ResidualMode::Value);
        let wres = (y - mu) / delta;
        assert_relative_eq!(r.logden_smooth, -(delta * 2.0_f64.sqrt()).ln(), epsilon = 1e-12);
        assert_relative_eq!(r.logden_sub_abs, 2.0_f64.sqrt() * wres, epsilon = 1e-12);
        // Laplace density: exp(-sqrt(2)|y - mu| / delta) / (delta sqrt 2)
        let direct = -(delta * 2.0_f64.sqrt()).ln() - 2.0_f64.sqrt() * (y - mu).abs() / delta;
        assert_relative_eq!(r.log_density(), direct, epsilon = 1e-10);
    }

    #[test]
    fn test_log_gaussian_value_uses_transformed_scale() {
        let (y, mu, delta, eta) = (2.0, 1.5, 0.3, 0.1);
        let r = residual_density(0.0, y, mu, delta, DensityKind::LogGaussian, eta, 0, ResidualMode::Value);
        let sigma = (mu + eta + delta).ln() - (mu + eta).ln();
        let wres = ((y + eta).ln() - (mu + eta).ln()) / sigma;
        assert_relative_eq!(r.wres, wres, epsilon = 1e-12);
        assert_relative_eq!(
            r.logden_smooth,
            -(sigma * (2.0 * PI).sqrt()).ln() - wres * wres / 2.0,
            epsilon = 1e-12
        );
    }

    // ========================================
    // Difference mode
    // ========================================

    #[test]
    fn test_gaussian_difference_closed_form() {
        let (z, y, mu, delta) = (1.0, 0.25, 0.5, 0.1);
        let r = residual_density(z, y, mu, delta, DensityKind::Gaussian, 0.0, 0, ResidualMode::Difference);
        assert_relative_eq!(r.wres, (z - y - mu) / delta, epsilon = 1e-12);
    }

    #[test]
    fn test_log_laplace_difference_uses_delta_directly() {
        let (z, y, mu, delta, eta) = (3.0, 2.0, 0.1, 0.2, 0.5);
        let r = residual_density(z, y, mu, delta, DensityKind::LogLaplace, eta, 0, ResidualMode::Difference);
        let wres = ((z + eta).ln() - (y + eta).ln() - mu) / delta;
        assert_relative_eq!(r.wres, wres, epsilon = 1e-12);
        assert_relative_eq!(r.logden_smooth, -(delta * 2.0_f64.sqrt()).ln(), epsilon = 1e-12);
        assert_relative_eq!(r.logden_sub_abs, 2.0_f64.sqrt() * wres, epsilon = 1e-12);
    }

    #[test]
    fn test_value_and_difference_scales_differ_for_log_family() {
        let value = residual_density(0.0, 2.0, 1.0, 0.5, DensityKind::LogGaussian, 0.0, 0, ResidualMode::Value);
        let diff = residual_density(2.0, 1.0, 0.0, 0.5, DensityKind::LogGaussian, 0.0, 0, ResidualMode::Difference);
        // Same log ratio, different scale
        assert!((value.wres - diff.wres).abs() > 1e-3);
    }

    #[test]
    fn test_uniform_is_all_zero() {
        for mode in [ResidualMode::Value, ResidualMode::Difference] {
            let r = residual_density(5.0, 1.0, 2.0, 3.0, DensityKind::Uniform, 0.0, 9, mode);
            assert_eq!(r.wres, 0.0);
            assert_eq!(r.logden_smooth, 0.0);
            assert_eq!(r.logden_sub_abs, 0.0);
            assert_eq!(r.index, 9);
        }
    }

    // ========================================
    // Prior validation
    // ========================================

    #[test]
    fn test_prior_rejects_bad_parameters() {
        assert!(Prior::new(DensityKind::Gaussian, 0.0, 0.0, 0.0).is_err());
        assert!(Prior::new(DensityKind::Laplace, f64::NAN, 1.0, 0.0).is_err());
        assert!(Prior::new(DensityKind::LogGaussian, 1.0, 1.0, f64::INFINITY).is_err());
        assert!(Prior::new(DensityKind::Uniform, f64::NAN, -1.0, 0.0).is_ok());
        assert!(Prior::new(DensityKind::LogLaplace, 1.0, 0.5, 1e-3).is_ok());
    }

    #[test]
    fn test_prior_residual_matches_free_function() {
        let prior = Prior::gaussian(0.5, 2.0).unwrap();
        let a = prior.residual(0.0, 1.0, ResidualMode::Value, 4);
        let b = residual_density(0.0, 1.0, 0.5, 2.0, DensityKind::Gaussian, 0.0, 4, ResidualMode::Value);
        assert_eq!(a, b);
    }

    #[cfg(feature = "num-dual-mode")]
    #[test]
    fn test_gaussian_derivative_wrt_y() {
        use num_dual::Dual64;
        let prior = Prior::gaussian(1.0, 0.5).unwrap();
        let y = Dual64::new(2.0, 1.0);
        let r = prior.residual(Dual64::from(0.0), y, ResidualMode::Value, 0);
        // d/dy [-(y - mu)^2 / (2 delta^2)] = -(y - mu) / delta^2
        assert_relative_eq!(r.logden_smooth.eps, -4.0, epsilon = 1e-12);
    }
}
