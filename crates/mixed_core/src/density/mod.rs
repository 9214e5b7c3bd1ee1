//! Residual densities and their accumulation.
//!
//! - [`residual_density`]: one observation against a distribution family
//! - [`ResidualBundle`] / [`DensityTerms`]: log-density and objective forms
//! - [`GridPrior`]: age/time smoothing prior over a grid of values

pub mod bundle;
pub mod grid;
pub mod residual;

pub use bundle::{DensityTerms, ResidualBundle};
pub use grid::GridPrior;
pub use residual::{residual_density, DensityKind, Prior, Residual, ResidualMode};
