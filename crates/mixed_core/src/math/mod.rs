//! Dense linear algebra helpers.

pub mod cholesky;

pub use cholesky::Cholesky;
