//! Damped Newton optimisation of the random effects.

use crate::config::ProfilerConfig;
use crate::error::OptimiserError;
use mixed_ad::{GradientRecording, JointDensity, Recorder};
use mixed_core::math::Cholesky;
use tracing::trace;

fn inf_norm(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

fn random_gradient(
    gradient: &GradientRecording,
    fixed: &[f64],
    random: &[f64],
) -> Result<Vec<f64>, OptimiserError> {
    let grad = gradient.eval(fixed, random)?;
    if grad.iter().any(|g| !g.is_finite()) {
        return Err(OptimiserError::NonFinite {
            context: "random effects gradient",
        });
    }
    Ok(grad)
}

/// Minimise `f(fixed, ·)` starting at `start`.
///
/// Each step solves `f_uu Δ = ∂f/∂u` with a dense Cholesky factor and halves
/// the step until `f` does not increase (up to rounding). Converged when
/// `|∂f/∂u|_inf <= config.tolerance`. The gradient is recorded once at
/// `start` and replayed at every iterate.
///
/// # Errors
/// - `ProfileFailure` when the iteration or backtracking limits are reached
/// - `Core(NotPositiveDefinite)` when `f_uu` is not positive definite
pub fn newton_random<J: JointDensity>(
    recorder: &mut Recorder<J>,
    fixed: &[f64],
    start: &[f64],
    config: &ProfilerConfig,
) -> Result<Vec<f64>, OptimiserError> {
    let n_random = recorder.n_random();
    if start.len() != n_random {
        return Err(OptimiserError::size("random effects start", n_random, start.len()));
    }
    let mut u = start.to_vec();
    let mut f = recorder.joint_value(fixed, &u)?;
    let gradient = recorder.record_gradient(fixed, &u)?;
    let mut grad = random_gradient(&gradient, fixed, &u)?;
    let mut norm = inf_norm(&grad);

    for iteration in 0..config.max_iterations {
        trace!(iteration, objective = f, gradient_norm = norm, "random effects Newton step");
        if norm <= config.tolerance {
            return Ok(u);
        }
        let hessian = recorder.record_hes_ran(fixed, &u)?;
        let step = Cholesky::factor_sparse(&hessian, n_random)?.solve(&grad)?;

        // rounding allowance once the decrease is below machine precision
        let slack = 16.0 * f64::EPSILON * f.abs().max(1.0);
        let mut t = 1.0;
        let mut accepted = false;
        for _ in 0..config.max_backtracks {
            let candidate: Vec<f64> = u.iter().zip(&step).map(|(ui, di)| ui - t * di).collect();
            if let Ok(fc) = recorder.joint_value(fixed, &candidate) {
                if fc <= f + slack {
                    u = candidate;
                    f = fc;
                    accepted = true;
                    break;
                }
            }
            t *= 0.5;
        }
        if !accepted {
            return Err(OptimiserError::ProfileFailure {
                iterations: iteration + 1,
                gradient_norm: norm,
            });
        }
        grad = random_gradient(&gradient, fixed, &u)?;
        norm = inf_norm(&grad);
    }

    if norm <= config.tolerance {
        return Ok(u);
    }
    Err(OptimiserError::ProfileFailure {
        iterations: config.max_iterations,
        gradient_norm: norm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mixed_core::density::DensityTerms;
    use mixed_core::types::Scalar;

    /// f = Σ_i exp(u_i) - θ u_i + (u_1 - u_0)² / 2
    struct Poisson;

    impl JointDensity for Poisson {
        fn n_fixed(&self) -> usize {
            1
        }

        fn n_random(&self) -> usize {
            2
        }

        fn eval<S: Scalar>(&self, fixed: &[S], random: &[S]) -> DensityTerms<S> {
            let d = random[1] - random[0];
            let mut f = d * d / S::from_f64(2.0);
            for &u in random {
                f = f + u.exp() - fixed[0] * u;
            }
            DensityTerms::smooth_only(f)
        }
    }

    #[test]
    fn test_newton_reaches_stationary_point() {
        let mut recorder = Recorder::new(Poisson);
        let u = newton_random(&mut recorder, &[2.0], &[0.0, 3.0], &ProfilerConfig::default()).unwrap();
        // symmetric optimum: exp(u) = θ
        assert_relative_eq!(u[0], 2.0_f64.ln(), epsilon = 1e-9);
        assert_relative_eq!(u[1], 2.0_f64.ln(), epsilon = 1e-9);
    }

    #[test]
    fn test_newton_iteration_limit() {
        let mut recorder = Recorder::new(Poisson);
        let config = ProfilerConfig::default().with_max_iterations(1);
        let err = newton_random(&mut recorder, &[2.0], &[5.0, -5.0], &config).unwrap_err();
        assert!(matches!(err, OptimiserError::ProfileFailure { iterations: 1, .. }));
    }

    #[test]
    fn test_wrong_start_length() {
        let mut recorder = Recorder::new(Poisson);
        assert!(newton_random(&mut recorder, &[2.0], &[0.0], &ProfilerConfig::default()).is_err());
    }
}
