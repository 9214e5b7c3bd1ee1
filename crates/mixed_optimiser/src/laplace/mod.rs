//! Reference Laplace-approximation model.
//!
//! [`LaplaceModel`] combines a [`JointDensity`] `f(θ, u)` and a
//! [`FixedPrior`] into a [`MixedModel`]:
//!
//! - random effects are profiled by damped Newton ([`newton_random`]);
//! - the objective is `f(θ, û) + ½ ln det f_uu(θ, û) - (n_random / 2) ln 2π`;
//! - its gradient in `θ` follows `û(θ)` through the implicit function
//!   `dû/dθ = -f_uu⁻¹ f_uθ`, with the derivative of the log-determinant
//!   taken from a `Dual64` replay of the random Hessian;
//! - its Hessian adds to the profiled curvature `f_θθ - f_uθᵀ f_uu⁻¹ f_uθ`
//!   the second derivative of `½ ln det f_uu`, from `Dual64` and
//!   `HyperDual64` replays of the random Hessian along `(e_k, dû/dθ_k)`.

mod prior;
mod profiler;

pub use prior::PriorRecorder;
pub use profiler::newton_random;

use crate::config::ProfilerConfig;
use crate::error::OptimiserError;
use crate::model::{FixedPrior, MixedModel};
use mixed_ad::{JointDensity, Recorder};
use mixed_core::math::Cholesky;
use mixed_core::sparsity::{SparseMatrix, SparsityPattern};
use num_dual::{Dual64, HyperDual64};
use std::f64::consts::PI;

/// Laplace-approximation model of a joint density and a fixed-effects prior.
#[derive(Debug)]
pub struct LaplaceModel<J, P> {
    recorder: Recorder<J>,
    prior: PriorRecorder<P>,
    config: ProfilerConfig,
}

impl<J: JointDensity, P: FixedPrior> LaplaceModel<J, P> {
    /// Model with the default profiler configuration.
    ///
    /// # Errors
    /// `InvalidInput` if the density and the prior disagree on `n_fixed`.
    pub fn new(density: J, prior: P) -> Result<Self, OptimiserError> {
        if density.n_fixed() != prior.n_fixed() {
            return Err(OptimiserError::InvalidInput(format!(
                "joint density has {} fixed effects, prior has {}",
                density.n_fixed(),
                prior.n_fixed()
            )));
        }
        Ok(Self {
            recorder: Recorder::new(density),
            prior: PriorRecorder::new(prior),
            config: ProfilerConfig::default(),
        })
    }

    /// Replace the profiler configuration.
    pub fn with_config(mut self, config: ProfilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Profiler configuration.
    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Derivative recorder of the joint density.
    pub fn recorder(&self) -> &Recorder<J> {
        &self.recorder
    }

    /// Mutable access, e.g. to [`Recorder::invalidate`] after a model change.
    pub fn recorder_mut(&mut self) -> &mut Recorder<J> {
        &mut self.recorder
    }

    fn check_point(&self, fixed: &[f64], random: &[f64]) -> Result<(), OptimiserError> {
        if fixed.len() != self.recorder.n_fixed() {
            return Err(OptimiserError::size("fixed effects", self.recorder.n_fixed(), fixed.len()));
        }
        if random.len() != self.recorder.n_random() {
            return Err(OptimiserError::size("random effects", self.recorder.n_random(), random.len()));
        }
        Ok(())
    }

    /// `f_uθ` as a dense row-major `n_random × n_fixed` block, read from the
    /// mixed Hessian.
    fn cross_block(&mut self, fixed: &[f64], random: &[f64]) -> Result<Vec<f64>, OptimiserError> {
        let n_fixed = self.recorder.n_fixed();
        let mixed = self.recorder.record_hessian(fixed, random)?;
        let mut cross = vec![0.0; self.recorder.n_random() * n_fixed];
        for (r, c, v) in mixed.triplets() {
            if c < n_fixed {
                cross[(r - n_fixed) * n_fixed + c] = v;
            }
        }
        Ok(cross)
    }

    fn random_factor(&mut self, fixed: &[f64], random: &[f64]) -> Result<(SparseMatrix, Cholesky), OptimiserError> {
        let hessian = self.recorder.record_hes_ran(fixed, random)?;
        let factor = Cholesky::factor_sparse(&hessian, self.recorder.n_random())?;
        Ok((hessian, factor))
    }
}

impl<J: JointDensity, P: FixedPrior> MixedModel for LaplaceModel<J, P> {
    fn n_fixed(&self) -> usize {
        self.recorder.n_fixed()
    }

    fn n_random(&self) -> usize {
        self.recorder.n_random()
    }

    fn prior_eval(&mut self, fixed: &[f64]) -> Result<Vec<f64>, OptimiserError> {
        self.prior.eval(fixed)
    }

    fn prior_jac(&mut self, fixed: &[f64]) -> Result<SparseMatrix, OptimiserError> {
        self.prior.jac(fixed)
    }

    fn prior_hes(&mut self, fixed: &[f64], weights: &[f64]) -> Result<SparseMatrix, OptimiserError> {
        self.prior.hes(fixed, weights)
    }

    fn optimize_random(&mut self, fixed: &[f64], random_start: &[f64]) -> Result<Vec<f64>, OptimiserError> {
        newton_random(&mut self.recorder, fixed, random_start, &self.config)
    }

    fn laplace_eval(
        &mut self,
        fixed_model: &[f64],
        fixed_point: &[f64],
        random: &[f64],
    ) -> Result<f64, OptimiserError> {
        self.check_point(fixed_model, random)?;
        let f = self.recorder.joint_value(fixed_point, random)?;
        let n_random = self.recorder.n_random();
        if n_random == 0 {
            return Ok(f);
        }
        let (_, factor) = self.random_factor(fixed_model, random)?;
        Ok(f + 0.5 * factor.log_det() - 0.5 * n_random as f64 * (2.0 * PI).ln())
    }

    fn laplace_grad_fix(&mut self, fixed: &[f64], random: &[f64]) -> Result<Vec<f64>, OptimiserError> {
        self.check_point(fixed, random)?;
        let n_fixed = self.recorder.n_fixed();
        let n_random = self.recorder.n_random();
        // ∂f/∂u vanishes at û, so the joint density contributes ∂f/∂θ only
        let mut grad = self.recorder.joint_gradient(fixed, random)?;
        grad.truncate(n_fixed);
        if n_random == 0 {
            return Ok(grad);
        }

        let (hessian, factor) = self.random_factor(fixed, random)?;
        let inverse = factor.inverse();
        let cross = self
            .recorder
            .record_hes_cross(fixed, random)?
            .to_dense(n_random, n_fixed, false);

        for (k, g) in grad.iter_mut().enumerate() {
            let column: Vec<f64> = (0..n_random).map(|i| cross[i * n_fixed + k]).collect();
            let solved = factor.solve(&column)?;
            let fixed_dir: Vec<Dual64> = fixed
                .iter()
                .enumerate()
                .map(|(i, &v)| Dual64::new(v, unit(i, k)))
                .collect();
            let random_dir: Vec<Dual64> = random
                .iter()
                .zip(&solved)
                .map(|(&v, &s)| Dual64::new(v, -s))
                .collect();
            let directional = self.recorder.hes_ran_eval(&fixed_dir, &random_dir)?;

            // tr(f_uu⁻¹ Ḟ) over the symmetric matrix stored as its lower triangle
            let mut trace = 0.0;
            for ((r, c), h) in hessian.pattern().iter().zip(&directional) {
                let weight = if r == c { 1.0 } else { 2.0 };
                trace += weight * inverse[r * n_random + c] * h.eps;
            }
            *g += 0.5 * trace;
        }

        if grad.iter().any(|g| !g.is_finite()) {
            return Err(OptimiserError::NonFinite {
                context: "Laplace gradient",
            });
        }
        Ok(grad)
    }

    fn laplace_hes_fix(&mut self, fixed: &[f64], random: &[f64]) -> Result<SparseMatrix, OptimiserError> {
        self.check_point(fixed, random)?;
        let n_fixed = self.recorder.n_fixed();
        let n_random = self.recorder.n_random();
        let mut dense = self
            .recorder
            .record_hes_fix(fixed, random)?
            .to_dense(n_fixed, n_fixed, true);

        if n_random > 0 {
            let (hessian, factor) = self.random_factor(fixed, random)?;
            let inverse = factor.inverse();
            let cross = self.cross_block(fixed, random)?;

            // dû/dθ_k = -f_uu⁻¹ f_uθ[:, k]
            let mut slopes = Vec::with_capacity(n_fixed);
            for k in 0..n_fixed {
                let column: Vec<f64> = (0..n_random).map(|a| cross[a * n_fixed + k]).collect();
                let solved = factor.solve(&column)?;
                slopes.push(solved.into_iter().map(|s| -s).collect::<Vec<f64>>());
            }

            // f_uu⁻¹ Ḟ_k with Ḟ_k the derivative of f_uu along (e_k, dû/dθ_k)
            let mut scaled = Vec::with_capacity(n_fixed);
            for (k, slope) in slopes.iter().enumerate() {
                let fixed_dir: Vec<Dual64> = fixed
                    .iter()
                    .enumerate()
                    .map(|(m, &v)| Dual64::new(v, unit(m, k)))
                    .collect();
                let random_dir: Vec<Dual64> = random.iter().zip(slope).map(|(&v, &s)| Dual64::new(v, s)).collect();
                let directional = self.recorder.hes_ran_eval(&fixed_dir, &random_dir)?;
                let mut rate = vec![0.0; n_random * n_random];
                for ((r, c), h) in hessian.pattern().iter().zip(&directional) {
                    rate[r * n_random + c] = h.eps;
                    rate[c * n_random + r] = h.eps;
                }
                scaled.push(multiply(&inverse, &rate, n_random));
            }

            let gradient = self.recorder.record_gradient(fixed, random)?;
            for j in 0..n_fixed {
                for i in j..n_fixed {
                    let profiled: f64 = (0..n_random).map(|a| cross[a * n_fixed + i] * slopes[j][a]).sum();

                    let fixed_dir: Vec<HyperDual64> = fixed
                        .iter()
                        .enumerate()
                        .map(|(m, &v)| HyperDual64::new(v, unit(m, i), unit(m, j), 0.0))
                        .collect();
                    let mut random_dir: Vec<HyperDual64> = (0..n_random)
                        .map(|a| HyperDual64::new(random[a], slopes[i][a], slopes[j][a], 0.0))
                        .collect();
                    // f_u vanishes along û(θ), which fixes d²û/dθ_i dθ_j
                    let residual: Vec<f64> = gradient
                        .eval(&fixed_dir, &random_dir)?
                        .iter()
                        .map(|g| g.eps1eps2)
                        .collect();
                    let bend = factor.solve(&residual)?;
                    for (d, b) in random_dir.iter_mut().zip(&bend) {
                        d.eps1eps2 = -b;
                    }
                    let second = self.recorder.hes_ran_eval(&fixed_dir, &random_dir)?;

                    // ∂²/∂θ_i∂θ_j ln det f_uu = tr(f_uu⁻¹ F̈) - tr(f_uu⁻¹ Ḟ_i f_uu⁻¹ Ḟ_j)
                    let mut trace_second = 0.0;
                    for ((r, c), h) in hessian.pattern().iter().zip(&second) {
                        let weight = if r == c { 1.0 } else { 2.0 };
                        trace_second += weight * inverse[r * n_random + c] * h.eps1eps2;
                    }
                    let mut trace_product = 0.0;
                    for a in 0..n_random {
                        for b in 0..n_random {
                            trace_product += scaled[i][a * n_random + b] * scaled[j][b * n_random + a];
                        }
                    }
                    dense[i * n_fixed + j] += profiled + 0.5 * (trace_second - trace_product);
                }
            }
        }

        let pattern = SparsityPattern::dense_lower(n_fixed);
        let values: Vec<f64> = pattern.iter().map(|(r, c)| dense[r * n_fixed + c]).collect();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(OptimiserError::NonFinite {
                context: "Laplace Hessian",
            });
        }
        Ok(SparseMatrix::new(pattern, values)?)
    }
}

fn unit(i: usize, k: usize) -> f64 {
    if i == k {
        1.0
    } else {
        0.0
    }
}

/// Dense `n × n` product, row-major.
fn multiply(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; n * n];
    for r in 0..n {
        for k in 0..n {
            let left = a[r * n + k];
            if left == 0.0 {
                continue;
            }
            for c in 0..n {
                out[r * n + c] += left * b[k * n + c];
            }
        }
    }
    out
}
