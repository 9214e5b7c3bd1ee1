//! Interior-point NLP adapter for the fixed-effects problem.
//!
//! - [`NlpProblem`]: the solver's callback contract
//! - [`IpoptFixed`]: slack reformulation of a [`MixedModel`](crate::model::MixedModel)
//!   with incumbent tracking
//! - [`check_kkt`]: independent first-order check used at finalisation
//! - [`SolverStatus`]: solver return codes

mod ipopt_fixed;
mod kkt;
mod nlp;
mod status;

pub use ipopt_fixed::{AdapterState, BestSoFar, IpoptFixed};
pub use kkt::{check_kkt, KktReport};
pub use nlp::{NlpProblem, NlpSizes, NlpSolution};
pub use status::SolverStatus;
