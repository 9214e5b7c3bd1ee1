//! Independent first-order optimality check of a returned solution.

use super::nlp::{NlpProblem, NlpSolution};
use super::status::SolverStatus;
use crate::error::OptimiserError;

/// Worst violation of each first-order condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KktReport {
    /// Solver status the solution came with.
    pub status: SolverStatus,
    /// Largest distance of `x` outside `[x_l, x_u]`.
    pub bound_violation: f64,
    /// Largest negative part of `z_l` and `z_u`.
    pub multiplier_violation: f64,
    /// Largest distance of `g(x)` outside `[g_l, g_u]`.
    pub constraint_violation: f64,
    /// `|∇f + Jᵀλ - z_l + z_u|_inf`.
    pub stationarity: f64,
    /// Absolute tolerance applied.
    pub tolerance: f64,
}

impl KktReport {
    /// Whether every condition holds within the tolerance.
    pub fn ok(&self) -> bool {
        self.bound_violation <= self.tolerance
            && self.multiplier_violation <= self.tolerance
            && self.constraint_violation <= self.tolerance
            && self.stationarity <= self.tolerance
    }
}

fn check_len(context: &str, expected: usize, got: usize) -> Result<(), OptimiserError> {
    if expected != got {
        return Err(OptimiserError::size(context, expected, got));
    }
    Ok(())
}

fn called(ok: bool, callback: &'static str) -> Result<(), OptimiserError> {
    if ok {
        Ok(())
    } else {
        Err(OptimiserError::EvaluationFailed { callback })
    }
}

/// Recompute bounds, constraints and the Lagrangian gradient of `problem` at
/// `solution` and measure every violation.
///
/// Checks run regardless of the solver status.
///
/// # Errors
/// - `ContractViolation` if the solution vectors do not match the sizes
/// - `EvaluationFailed` if a callback of `problem` fails
pub fn check_kkt<P: NlpProblem + ?Sized>(
    problem: &mut P,
    solution: &NlpSolution,
    tolerance: f64,
) -> Result<KktReport, OptimiserError> {
    let sizes = problem.get_sizes();
    let (n, m) = (sizes.n, sizes.m);
    check_len("solution x", n, solution.x.len())?;
    check_len("solution z_l", n, solution.z_l.len())?;
    check_len("solution z_u", n, solution.z_u.len())?;
    check_len("solution lambda", m, solution.lambda.len())?;
    let x = &solution.x;

    let mut x_l = vec![0.0; n];
    let mut x_u = vec![0.0; n];
    let mut g_l = vec![0.0; m];
    let mut g_u = vec![0.0; m];
    called(problem.get_bounds(&mut x_l, &mut x_u, &mut g_l, &mut g_u), "get_bounds")?;

    let mut bound_violation = 0.0_f64;
    let mut multiplier_violation = 0.0_f64;
    for j in 0..n {
        bound_violation = bound_violation.max(x_l[j] - x[j]).max(x[j] - x_u[j]);
        multiplier_violation = multiplier_violation
            .max(-solution.z_l[j])
            .max(-solution.z_u[j]);
    }

    let mut grad = vec![0.0; n];
    called(problem.eval_grad_f(x, true, &mut grad), "eval_grad_f")?;
    let mut g = vec![0.0; m];
    called(problem.eval_g(x, false, &mut g), "eval_g")?;

    let mut constraint_violation = 0.0_f64;
    for i in 0..m {
        constraint_violation = constraint_violation.max(g_l[i] - g[i]).max(g[i] - g_u[i]);
    }

    let nnz = sizes.nnz_jac_g;
    let mut rows = vec![0; nnz];
    let mut cols = vec![0; nnz];
    let mut jac = vec![0.0; nnz];
    called(problem.jac_g_structure(&mut rows, &mut cols), "jac_g_structure")?;
    called(problem.eval_jac_g(x, false, &mut jac), "eval_jac_g")?;

    // ∇f + Jᵀλ - z_l + z_u
    let mut lagrangian: Vec<f64> = (0..n)
        .map(|j| grad[j] - solution.z_l[j] + solution.z_u[j])
        .collect();
    for k in 0..nnz {
        if rows[k] >= m || cols[k] >= n {
            return Err(OptimiserError::ContractViolation(format!(
                "Jacobian entry ({}, {}) outside {} x {}",
                rows[k], cols[k], m, n
            )));
        }
        lagrangian[cols[k]] += jac[k] * solution.lambda[rows[k]];
    }
    let stationarity = lagrangian.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));

    Ok(KktReport {
        status: solution.status,
        bound_violation,
        multiplier_violation,
        constraint_violation,
        stationarity,
        tolerance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::nlp::NlpSizes;

    /// min (x0 - 1)² + (x1 - 2)²  s.t.  x0 + x1 = 1,  -1 <= x0 <= 1
    struct Toy;

    impl NlpProblem for Toy {
        fn get_sizes(&mut self) -> NlpSizes {
            NlpSizes {
                n: 2,
                m: 1,
                nnz_jac_g: 2,
                nnz_h_lag: 2,
            }
        }

        fn get_bounds(&mut self, x_l: &mut [f64], x_u: &mut [f64], g_l: &mut [f64], g_u: &mut [f64]) -> bool {
            x_l.copy_from_slice(&[-1.0, -1e19]);
            x_u.copy_from_slice(&[1.0, 1e19]);
            g_l[0] = 1.0;
            g_u[0] = 1.0;
            true
        }

        fn get_starting_point(&mut self, x: &mut [f64]) -> bool {
            x.fill(0.0);
            true
        }

        fn eval_f(&mut self, x: &[f64], _new_x: bool, obj_value: &mut f64) -> bool {
            *obj_value = (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2);
            true
        }

        fn eval_grad_f(&mut self, x: &[f64], _new_x: bool, grad_f: &mut [f64]) -> bool {
            grad_f[0] = 2.0 * (x[0] - 1.0);
            grad_f[1] = 2.0 * (x[1] - 2.0);
            true
        }

        fn eval_g(&mut self, x: &[f64], _new_x: bool, g: &mut [f64]) -> bool {
            g[0] = x[0] + x[1];
            true
        }

        fn jac_g_structure(&mut self, rows: &mut [usize], cols: &mut [usize]) -> bool {
            rows.copy_from_slice(&[0, 0]);
            cols.copy_from_slice(&[0, 1]);
            true
        }

        fn eval_jac_g(&mut self, _x: &[f64], _new_x: bool, values: &mut [f64]) -> bool {
            values.fill(1.0);
            true
        }

        fn hess_structure(&mut self, rows: &mut [usize], cols: &mut [usize]) -> bool {
            rows.copy_from_slice(&[0, 1]);
            cols.copy_from_slice(&[0, 1]);
            true
        }

        fn eval_h(
            &mut self,
            _x: &[f64],
            _new_x: bool,
            obj_factor: f64,
            _lambda: &[f64],
            _new_lambda: bool,
            values: &mut [f64],
        ) -> bool {
            values.fill(2.0 * obj_factor);
            true
        }

        fn finalize_solution(&mut self, _solution: &NlpSolution) {}
    }

    fn optimum() -> NlpSolution {
        NlpSolution {
            status: SolverStatus::Success,
            x: vec![0.0, 1.0],
            z_l: vec![0.0, 0.0],
            z_u: vec![0.0, 0.0],
            g: vec![1.0],
            lambda: vec![2.0],
            obj_value: 2.0,
        }
    }

    #[test]
    fn test_known_optimum_passes() {
        let report = check_kkt(&mut Toy, &optimum(), 1e-7).unwrap();
        assert!(report.ok(), "{:?}", report);
        assert_eq!(report.stationarity, 0.0);
    }

    #[test]
    fn test_perturbed_optimum_fails() {
        for j in 0..2 {
            let mut solution = optimum();
            solution.x[j] += 1e-3;
            let report = check_kkt(&mut Toy, &solution, 1e-7).unwrap();
            assert!(!report.ok());
            assert!(report.constraint_violation > 5e-4);
            assert!(report.stationarity > 1e-3);
        }
    }

    #[test]
    fn test_bound_and_multiplier_violations() {
        let mut solution = optimum();
        solution.x = vec![1.5, -0.5];
        solution.z_u = vec![-0.1, 0.0];
        let report = check_kkt(&mut Toy, &solution, 1e-7).unwrap();
        assert!((report.bound_violation - 0.5).abs() < 1e-15);
        assert!((report.multiplier_violation - 0.1).abs() < 1e-15);
    }

    #[test]
    fn test_status_is_reported_not_enforced() {
        let mut solution = optimum();
        solution.status = SolverStatus::MaxIterExceeded;
        let report = check_kkt(&mut Toy, &solution, 1e-7).unwrap();
        assert!(report.ok());
        assert_eq!(report.status, SolverStatus::MaxIterExceeded);
    }

    #[test]
    fn test_wrong_solution_length() {
        let mut solution = optimum();
        solution.lambda.clear();
        assert!(check_kkt(&mut Toy, &solution, 1e-7).is_err());
    }
}
