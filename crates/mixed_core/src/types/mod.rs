//! Core numeric and error types.
//!
//! This module provides:
//! - `scalar`: The [`Scalar`] arithmetic bound implemented for `f64` and, with
//!   `num-dual-mode`, for num-dual's `Dual` and `HyperDual` numbers
//! - `error`: Structured error type [`CoreError`]

pub mod error;
pub mod scalar;

pub use error::CoreError;
pub use scalar::Scalar;
