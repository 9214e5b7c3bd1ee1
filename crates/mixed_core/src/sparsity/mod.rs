//! Sparsity patterns and their merge.

pub mod merge;
pub mod pattern;

pub use merge::{merge_sparse, MergedPattern};
pub use pattern::{SparseMatrix, SparsityPattern};
