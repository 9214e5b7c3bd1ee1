//! # mixed_ad: Derivative Recordings for Laplace Mixed-Effects Fitting
//!
//! ## Layer 2 (Differentiation) Role
//!
//! mixed_ad sits between the scalar/density foundation (`mixed_core`) and the
//! optimisation layer (`mixed_optimiser`), providing:
//! - An operation tape and immutable [`Recording`]s (`tape`)
//! - Structural Jacobian and Hessian sparsity detection (`sparsity`)
//! - Colored sparse Jacobian and Hessian evaluation plans (`plan`)
//! - The [`JointDensity`] contract (`density`)
//! - The [`Recorder`] for gradient, random, cross, mixed and fixed Hessians
//!   (`recorder`)
//!
//! ## Nested differentiation
//!
//! A [`Recording`] replays with any [`Scalar`](mixed_core::types::Scalar),
//! including its own [`TapeVar`]. Recording a replay yields a recording of the
//! replayed computation, so derivative recordings compose to any order.
//! Hessian values use num-dual forward-over-reverse sweeps.
//!
//! ## Usage Examples
//!
//! ```rust
//! use mixed_ad::{JointDensity, Recorder};
//! use mixed_core::density::DensityTerms;
//! use mixed_core::types::Scalar;
//!
//! struct Quadratic;
//!
//! impl JointDensity for Quadratic {
//!     fn n_fixed(&self) -> usize { 1 }
//!     fn n_random(&self) -> usize { 2 }
//!     fn eval<S: Scalar>(&self, fixed: &[S], random: &[S]) -> DensityTerms<S> {
//!         let a = random[0] - fixed[0];
//!         let b = random[1] - random[0];
//!         DensityTerms::smooth_only(a * a + b * b)
//!     }
//! }
//!
//! let mut recorder = Recorder::new(Quadratic);
//! let h = recorder.record_hes_ran(&[0.0], &[1.0, 2.0]).unwrap();
//! assert_eq!(h.rows(), &[0, 1, 1]);
//! assert_eq!(h.cols(), &[0, 0, 1]);
//! assert_eq!(h.values(), &[4.0, -2.0, 2.0]);
//! ```

pub mod density;
pub mod error;
pub mod plan;
pub mod recorder;
pub mod sparsity;
pub mod tape;

pub use density::JointDensity;
pub use error::AdError;
pub use plan::{HessianPlan, JacobianPlan};
pub use recorder::{GradientRecording, Recorder};
pub use sparsity::IndexSets;
pub use tape::{Node, Op, Recording, TapeVar};
