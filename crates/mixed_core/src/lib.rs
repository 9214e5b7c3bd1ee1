//! # mixed_core: Foundation for Laplace Mixed-Effects Fitting
//!
//! ## Layer 1 (Foundation) Role
//!
//! mixed_core is the bottom layer of the workspace, providing:
//! - The [`Scalar`](types::Scalar) arithmetic bound shared by every density
//!   evaluation (`types::scalar`)
//! - Structured errors (`types::error`)
//! - Residual densities, bundles and the age/time grid prior (`density`)
//! - Sparsity patterns and their position-mapped merge (`sparsity`)
//! - Dense Cholesky factorisation (`math`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use mixed_core::density::{DensityKind, Prior, ResidualBundle, ResidualMode};
//! use mixed_core::sparsity::{merge_sparse, SparsityPattern};
//!
//! // Log-density of two observations
//! let mut bundle = ResidualBundle::new();
//! let gaussian = Prior::new(DensityKind::Gaussian, 0.0, 1.0, 0.0).unwrap();
//! let laplace = Prior::new(DensityKind::Laplace, 0.0, 1.0, 0.0).unwrap();
//! bundle.push(&gaussian.residual(0.0_f64, 0.5, ResidualMode::Value, 0));
//! bundle.push(&laplace.residual(0.0_f64, -0.5, ResidualMode::Value, 1));
//! assert_eq!(bundle.sub_abs().len(), 1);
//!
//! // Union of two Hessian patterns
//! let one = SparsityPattern::dense_lower(2);
//! let two = SparsityPattern::from_pairs([(2, 0)]).unwrap();
//! let merged = merge_sparse(&one, &two);
//! assert_eq!(merged.pattern.len(), 4);
//! ```
//!
//! ## Feature Flags
//!
//! - `num-dual-mode` (default): [`Scalar`](types::Scalar) impls for num-dual's
//!   `Dual` and `HyperDual` numbers
//! - `serde`: Serialisation for density kinds and priors

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod density;
pub mod math;
pub mod sparsity;
pub mod types;
