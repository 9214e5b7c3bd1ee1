//! Configuration for the random-effects profiler and the NLP adapter.
//!
//! Both configurations follow the same shape: `Default`, presets, `with_*`
//! setters and a fluent builder whose `build` validates the values.

use crate::error::OptimiserError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// =============================================================================
// ProfilerConfig
// =============================================================================

/// Newton iteration limits for optimising the random effects.
///
/// # Examples
///
/// ```
/// use mixed_optimiser::config::ProfilerConfig;
///
/// let config = ProfilerConfig::default();
/// assert_eq!(config.max_iterations, 50);
///
/// let config = ProfilerConfig::builder()
///     .tolerance(1e-12)
///     .max_iterations(100)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_iterations, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProfilerConfig {
    /// Convergence tolerance on `|∂f/∂u|_inf`.
    ///
    /// Default: 1e-10
    pub tolerance: f64,

    /// Maximum number of Newton steps.
    ///
    /// Default: 50
    pub max_iterations: usize,

    /// Maximum number of step halvings per Newton step.
    ///
    /// Default: 40
    pub max_backtracks: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 50,
            max_backtracks: 40,
        }
    }
}

impl ProfilerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration builder.
    pub fn builder() -> ProfilerConfigBuilder {
        ProfilerConfigBuilder::new()
    }

    /// Relaxed tolerance (1e-6) and fewer iterations (20).
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 20,
            ..Self::default()
        }
    }

    /// Tight tolerance (1e-13) and more iterations (200).
    pub fn high_precision() -> Self {
        Self {
            tolerance: 1e-13,
            max_iterations: 200,
            ..Self::default()
        }
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the maximum number of Newton steps.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the maximum number of step halvings.
    pub fn with_max_backtracks(mut self, max_backtracks: usize) -> Self {
        self.max_backtracks = max_backtracks;
        self
    }

    /// Check that the tolerance is positive and the limits are non-zero.
    pub fn validate(&self) -> Result<(), OptimiserError> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(OptimiserError::InvalidInput(format!(
                "profiler tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(OptimiserError::InvalidInput(
                "profiler max_iterations must be positive".to_string(),
            ));
        }
        if self.max_backtracks == 0 {
            return Err(OptimiserError::InvalidInput(
                "profiler max_backtracks must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ProfilerConfig`].
#[derive(Debug, Clone)]
pub struct ProfilerConfigBuilder {
    config: ProfilerConfig,
}

impl ProfilerConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: ProfilerConfig::default(),
        }
    }

    /// Set the convergence tolerance.
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Set the maximum number of Newton steps.
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the maximum number of step halvings.
    pub fn max_backtracks(mut self, max_backtracks: usize) -> Self {
        self.config.max_backtracks = max_backtracks;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<ProfilerConfig, OptimiserError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ProfilerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// AdapterConfig
// =============================================================================

/// Settings of the interior-point adapter.
///
/// # Examples
///
/// ```
/// use mixed_optimiser::config::{AdapterConfig, ProfilerConfig};
///
/// let config = AdapterConfig::builder()
///     .kkt_tolerance(1e-9)
///     .profiler(ProfilerConfig::fast())
///     .build()
///     .unwrap();
/// assert!((config.finalize_tolerance() - 1e-8).abs() < 1e-20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdapterConfig {
    /// Magnitude the solver treats as an infinite bound.
    ///
    /// Default: 1e19
    pub infinity_magnitude: f64,

    /// Solver convergence tolerance the solution is checked against.
    ///
    /// Default: 1e-8
    pub kkt_tolerance: f64,

    /// Factor applied to `kkt_tolerance` by the finalisation check.
    ///
    /// Default: 10.0
    pub kkt_tolerance_scale: f64,

    /// Random-effects profiler limits.
    pub profiler: ProfilerConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            infinity_magnitude: 1e19,
            kkt_tolerance: 1e-8,
            kkt_tolerance_scale: 10.0,
            profiler: ProfilerConfig::default(),
        }
    }
}

impl AdapterConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration builder.
    pub fn builder() -> AdapterConfigBuilder {
        AdapterConfigBuilder::new()
    }

    /// Absolute tolerance used by the finalisation KKT check.
    pub fn finalize_tolerance(&self) -> f64 {
        self.kkt_tolerance * self.kkt_tolerance_scale
    }

    /// Set the infinite-bound magnitude.
    pub fn with_infinity_magnitude(mut self, magnitude: f64) -> Self {
        self.infinity_magnitude = magnitude;
        self
    }

    /// Set the KKT tolerance.
    pub fn with_kkt_tolerance(mut self, tolerance: f64) -> Self {
        self.kkt_tolerance = tolerance;
        self
    }

    /// Set the profiler configuration.
    pub fn with_profiler(mut self, profiler: ProfilerConfig) -> Self {
        self.profiler = profiler;
        self
    }

    /// Check every field, including the nested profiler configuration.
    pub fn validate(&self) -> Result<(), OptimiserError> {
        if !(self.infinity_magnitude > 0.0 && self.infinity_magnitude.is_finite()) {
            return Err(OptimiserError::InvalidInput(format!(
                "infinity magnitude must be positive and finite, got {}",
                self.infinity_magnitude
            )));
        }
        if !(self.kkt_tolerance > 0.0 && self.kkt_tolerance.is_finite()) {
            return Err(OptimiserError::InvalidInput(format!(
                "KKT tolerance must be positive, got {}",
                self.kkt_tolerance
            )));
        }
        if !(self.kkt_tolerance_scale >= 1.0 && self.kkt_tolerance_scale.is_finite()) {
            return Err(OptimiserError::InvalidInput(format!(
                "KKT tolerance scale must be at least 1, got {}",
                self.kkt_tolerance_scale
            )));
        }
        self.profiler.validate()
    }
}

/// Builder for [`AdapterConfig`].
#[derive(Debug, Clone)]
pub struct AdapterConfigBuilder {
    config: AdapterConfig,
}

impl AdapterConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: AdapterConfig::default(),
        }
    }

    /// Set the infinite-bound magnitude.
    pub fn infinity_magnitude(mut self, magnitude: f64) -> Self {
        self.config.infinity_magnitude = magnitude;
        self
    }

    /// Set the KKT tolerance.
    pub fn kkt_tolerance(mut self, tolerance: f64) -> Self {
        self.config.kkt_tolerance = tolerance;
        self
    }

    /// Set the KKT tolerance scale.
    pub fn kkt_tolerance_scale(mut self, scale: f64) -> Self {
        self.config.kkt_tolerance_scale = scale;
        self
    }

    /// Set the profiler configuration.
    pub fn profiler(mut self, profiler: ProfilerConfig) -> Self {
        self.config.profiler = profiler;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<AdapterConfig, OptimiserError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for AdapterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // Default Configuration Tests
    // ========================================

    #[test]
    fn test_default_profiler_config() {
        let config = ProfilerConfig::default();
        assert_eq!(config.tolerance, 1e-10);
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.max_backtracks, 40);
        assert_eq!(config, ProfilerConfig::new());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_adapter_config() {
        let config = AdapterConfig::default();
        assert_eq!(config.infinity_magnitude, 1e19);
        assert_eq!(config.kkt_tolerance, 1e-8);
        assert!((config.finalize_tolerance() - 1e-7).abs() < 1e-20);
        assert!(config.validate().is_ok());
    }

    // ========================================
    // Preset Configuration Tests
    // ========================================

    #[test]
    fn test_presets() {
        let fast = ProfilerConfig::fast();
        let precise = ProfilerConfig::high_precision();
        assert!(fast.tolerance > ProfilerConfig::default().tolerance);
        assert!(precise.tolerance < ProfilerConfig::default().tolerance);
        assert!(precise.max_iterations > fast.max_iterations);
    }

    // ========================================
    // Builder and Validation Tests
    // ========================================

    #[test]
    fn test_builder_sets_fields() {
        let config = AdapterConfig::builder()
            .infinity_magnitude(1e20)
            .kkt_tolerance_scale(2.0)
            .profiler(ProfilerConfig::default().with_max_backtracks(10))
            .build()
            .unwrap();
        assert_eq!(config.infinity_magnitude, 1e20);
        assert_eq!(config.kkt_tolerance_scale, 2.0);
        assert_eq!(config.profiler.max_backtracks, 10);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ProfilerConfig::builder().tolerance(0.0).build().is_err());
        assert!(ProfilerConfig::builder().tolerance(f64::NAN).build().is_err());
        assert!(ProfilerConfig::builder().max_iterations(0).build().is_err());
        assert!(AdapterConfig::builder().kkt_tolerance(-1.0).build().is_err());
        assert!(AdapterConfig::builder()
            .infinity_magnitude(f64::INFINITY)
            .build()
            .is_err());
        assert!(AdapterConfig::builder()
            .profiler(ProfilerConfig::default().with_max_backtracks(0))
            .build()
            .is_err());
    }
}
