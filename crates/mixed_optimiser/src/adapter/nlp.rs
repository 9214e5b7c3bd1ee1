//! Callback contract of an interior-point NLP solver.
//!
//! The solver minimises `f(x)` subject to `x_l <= x <= x_u` and
//! `g_l <= g(x) <= g_u`. Every callback reports success as a `bool`; output
//! buffers are pre-sized by the solver from [`NlpProblem::get_sizes`].
//! Sparse Jacobian and Hessian structures are requested once through the
//! `*_structure` methods, after which the value methods fill entries in the
//! same order. `new_x` is set when `x` differs from the previous callback.

use super::status::SolverStatus;

/// Problem dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NlpSizes {
    /// Number of variables.
    pub n: usize,
    /// Number of constraints.
    pub m: usize,
    /// Nonzeros in the constraint Jacobian.
    pub nnz_jac_g: usize,
    /// Nonzeros in the lower triangle of the Lagrangian Hessian.
    pub nnz_h_lag: usize,
}

/// Primal-dual point handed to [`NlpProblem::finalize_solution`].
#[derive(Debug, Clone, PartialEq)]
pub struct NlpSolution {
    /// Solver return code.
    pub status: SolverStatus,
    /// Variables.
    pub x: Vec<f64>,
    /// Multipliers of the lower variable bounds.
    pub z_l: Vec<f64>,
    /// Multipliers of the upper variable bounds.
    pub z_u: Vec<f64>,
    /// Constraint values reported by the solver.
    pub g: Vec<f64>,
    /// Constraint multipliers.
    pub lambda: Vec<f64>,
    /// Objective value reported by the solver.
    pub obj_value: f64,
}

/// Callbacks of a nonlinear program, in the interior-point solver's
/// convention: the Lagrangian is `σ f(x) + λᵀ g(x)` and stationarity reads
/// `∇f + Jᵀλ - z_l + z_u = 0`.
pub trait NlpProblem {
    /// Dimensions and nonzero counts.
    fn get_sizes(&mut self) -> NlpSizes;

    /// Variable and constraint bounds.
    fn get_bounds(&mut self, x_l: &mut [f64], x_u: &mut [f64], g_l: &mut [f64], g_u: &mut [f64]) -> bool;

    /// Initial primal point.
    fn get_starting_point(&mut self, x: &mut [f64]) -> bool;

    /// Objective value.
    fn eval_f(&mut self, x: &[f64], new_x: bool, obj_value: &mut f64) -> bool;

    /// Objective gradient.
    fn eval_grad_f(&mut self, x: &[f64], new_x: bool, grad_f: &mut [f64]) -> bool;

    /// Constraint values.
    fn eval_g(&mut self, x: &[f64], new_x: bool, g: &mut [f64]) -> bool;

    /// Row and column indices of the constraint Jacobian.
    fn jac_g_structure(&mut self, rows: &mut [usize], cols: &mut [usize]) -> bool;

    /// Constraint Jacobian values in structure order.
    fn eval_jac_g(&mut self, x: &[f64], new_x: bool, values: &mut [f64]) -> bool;

    /// Row and column indices of the lower triangle of the Lagrangian Hessian.
    fn hess_structure(&mut self, rows: &mut [usize], cols: &mut [usize]) -> bool;

    /// Lagrangian Hessian values in structure order.
    fn eval_h(
        &mut self,
        x: &[f64],
        new_x: bool,
        obj_factor: f64,
        lambda: &[f64],
        new_lambda: bool,
        values: &mut [f64],
    ) -> bool;

    /// Receive the final point.
    fn finalize_solution(&mut self, solution: &NlpSolution);
}
