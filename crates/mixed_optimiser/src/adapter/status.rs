//! Interior-point solver return codes.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Final status reported by the solver to `finalize_solution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SolverStatus {
    /// Converged to the requested tolerances.
    Success,
    /// Iteration limit reached.
    MaxIterExceeded,
    /// CPU time limit reached.
    CpuTimeExceeded,
    /// Steps became too small to make progress.
    StopAtTinyStep,
    /// Converged to the acceptable tolerances only.
    StopAtAcceptablePoint,
    /// Converged to a point of local infeasibility.
    LocalInfeasibility,
    /// A callback asked the solver to stop.
    UserRequestedStop,
    /// Iterates grew without bound.
    DivergingIterates,
    /// The feasibility restoration phase failed.
    RestorationFailure,
    /// The step computation failed.
    ErrorInStepComputation,
    /// A callback returned NaN or infinity.
    InvalidNumberDetected,
    /// Unclassified solver failure.
    InternalError,
}

impl SolverStatus {
    /// Whether the solver claims a (possibly acceptable) optimum.
    pub fn is_success(self) -> bool {
        matches!(self, SolverStatus::Success | SolverStatus::StopAtAcceptablePoint)
    }

    /// Short identifier.
    pub fn name(self) -> &'static str {
        match self {
            SolverStatus::Success => "success",
            SolverStatus::MaxIterExceeded => "max_iter_exceeded",
            SolverStatus::CpuTimeExceeded => "cpu_time_exceeded",
            SolverStatus::StopAtTinyStep => "stop_at_tiny_step",
            SolverStatus::StopAtAcceptablePoint => "stop_at_acceptable_point",
            SolverStatus::LocalInfeasibility => "local_infeasibility",
            SolverStatus::UserRequestedStop => "user_requested_stop",
            SolverStatus::DivergingIterates => "diverging_iterates",
            SolverStatus::RestorationFailure => "restoration_failure",
            SolverStatus::ErrorInStepComputation => "error_in_step_computation",
            SolverStatus::InvalidNumberDetected => "invalid_number_detected",
            SolverStatus::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses() {
        assert!(SolverStatus::Success.is_success());
        assert!(SolverStatus::StopAtAcceptablePoint.is_success());
        assert!(!SolverStatus::MaxIterExceeded.is_success());
        assert!(!SolverStatus::LocalInfeasibility.is_success());
    }

    #[test]
    fn test_display() {
        assert_eq!(SolverStatus::StopAtTinyStep.to_string(), "stop_at_tiny_step");
    }
}
