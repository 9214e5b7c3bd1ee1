//! # mixed_optimiser: Laplace Objective and Fixed-Effects NLP
//!
//! ## Layer 3 (Optimisation) Role
//!
//! mixed_optimiser turns derivative recordings (`mixed_ad`) into the
//! fixed-effects problem handed to an interior-point solver:
//!
//! - `model`: the [`MixedModel`](model::MixedModel) collaborator contract and
//!   the [`FixedPrior`](model::FixedPrior) trait
//! - `laplace`: reference [`LaplaceModel`](laplace::LaplaceModel) with Newton
//!   profiling of the random effects
//! - `adapter`: the [`NlpProblem`](adapter::NlpProblem) callback contract, the
//!   [`IpoptFixed`](adapter::IpoptFixed) slack reformulation of L1 prior terms
//!   and the finalisation KKT check
//! - `config`: profiler and adapter settings
//!
//! Library code installs no `tracing` subscriber.
//!
//! ## Features
//!
//! - `serde`: `Deserialize`/`Serialize` for the configuration types. The
//!   TOML loading tests need it: `cargo test -p mixed_optimiser --features serde`.
//!
//! ## Example
//!
//! ```rust
//! use mixed_ad::JointDensity;
//! use mixed_core::density::DensityTerms;
//! use mixed_core::types::Scalar;
//! use mixed_optimiser::laplace::LaplaceModel;
//! use mixed_optimiser::model::{FixedPrior, MixedModel};
//!
//! struct Shrinkage;
//! impl JointDensity for Shrinkage {
//!     fn n_fixed(&self) -> usize { 1 }
//!     fn n_random(&self) -> usize { 1 }
//!     fn eval<S: Scalar>(&self, fixed: &[S], random: &[S]) -> DensityTerms<S> {
//!         let d = random[0] - fixed[0];
//!         DensityTerms::smooth_only(d * d / S::from_f64(2.0))
//!     }
//! }
//!
//! struct Flat;
//! impl FixedPrior for Flat {
//!     fn n_fixed(&self) -> usize { 1 }
//!     fn eval<S: Scalar>(&self, _fixed: &[S]) -> DensityTerms<S> {
//!         DensityTerms::smooth_only(S::zero())
//!     }
//! }
//!
//! let mut model = LaplaceModel::new(Shrinkage, Flat).unwrap();
//! let u = model.optimize_random(&[2.0], &[0.0]).unwrap();
//! assert!((u[0] - 2.0).abs() < 1e-10);
//! ```

pub mod adapter;
pub mod config;
pub mod laplace;
pub mod model;

mod error;

pub use error::OptimiserError;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapter::*;
    pub use crate::config::*;
    pub use crate::laplace::*;
    pub use crate::model::*;
    pub use crate::OptimiserError;
}
