//! Fixed-effects optimisation as a smooth NLP.
//!
//! The prior's absolute-value terms `|a_j(θ)|` are replaced by slacks `s_j`
//! with the constraints
//!
//! ```text
//! g_{2j}   = s_j - a_j(θ) >= 0
//! g_{2j+1} = s_j + a_j(θ) >= 0
//! ```
//!
//! so that minimising `Σ s_j` drives `s_j = |a_j(θ)|` at the optimum. The
//! variable vector is `x = (θ, s)`.
//!
//! Every objective evaluation at a new `θ` re-profiles the random effects,
//! warm-started from the incumbent, and offers the true (non-relaxed)
//! objective to the [`BestSoFar`] incumbent.

use super::kkt::{check_kkt, KktReport};
use super::nlp::{NlpProblem, NlpSizes, NlpSolution};
use crate::config::AdapterConfig;
use crate::error::OptimiserError;
use crate::model::MixedModel;
use mixed_core::sparsity::{merge_sparse, MergedPattern, SparseMatrix, SparsityPattern};
use tracing::{debug, info, warn};

// =============================================================================
// BestSoFar
// =============================================================================

/// Incumbent point with the lowest true objective seen so far.
///
/// Only strict improvements replace the incumbent; it is never rolled back.
#[derive(Debug, Clone, PartialEq)]
pub struct BestSoFar {
    fixed: Vec<f64>,
    random: Vec<f64>,
    objective: f64,
}

impl Default for BestSoFar {
    fn default() -> Self {
        Self::new()
    }
}

impl BestSoFar {
    /// Empty incumbent with objective `+∞`.
    pub fn new() -> Self {
        Self {
            fixed: Vec::new(),
            random: Vec::new(),
            objective: f64::INFINITY,
        }
    }

    /// Replace the incumbent if `objective` is strictly lower.
    ///
    /// Returns whether the incumbent changed.
    pub fn offer(&mut self, fixed: &[f64], random: &[f64], objective: f64) -> bool {
        if objective < self.objective {
            self.fixed = fixed.to_vec();
            self.random = random.to_vec();
            self.objective = objective;
            true
        } else {
            false
        }
    }

    /// Whether any point has been accepted.
    pub fn is_set(&self) -> bool {
        self.objective < f64::INFINITY
    }

    /// True objective of the incumbent.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Fixed effects of the incumbent.
    pub fn fixed(&self) -> &[f64] {
        &self.fixed
    }

    /// Profiled random effects of the incumbent.
    pub fn random(&self) -> &[f64] {
        &self.random
    }
}

// =============================================================================
// IpoptFixed
// =============================================================================

/// Lifecycle of an [`IpoptFixed`] adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// Built; no evaluation yet.
    Constructed,
    /// The solver is calling back.
    Evaluating,
    /// `finalize_solution` has run; further evaluations fail.
    Finalized,
}

#[derive(Debug, Clone)]
struct Profiled {
    fixed: Vec<f64>,
    random: Vec<f64>,
}

fn same_bits(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn report<T>(callback: &'static str, result: Result<T, OptimiserError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(callback, %error, "NLP callback failed");
            None
        }
    }
}

fn check_buffer(context: &str, expected: usize, got: usize) -> Result<(), OptimiserError> {
    if expected != got {
        return Err(OptimiserError::size(context, expected, got));
    }
    Ok(())
}

/// Interior-point adapter for the fixed-effects problem of a [`MixedModel`].
///
/// # Examples
///
/// ```
/// use mixed_ad::JointDensity;
/// use mixed_core::density::DensityTerms;
/// use mixed_core::types::Scalar;
/// use mixed_optimiser::adapter::{IpoptFixed, NlpProblem};
/// use mixed_optimiser::config::AdapterConfig;
/// use mixed_optimiser::laplace::LaplaceModel;
/// use mixed_optimiser::model::FixedPrior;
///
/// struct Shrinkage;
/// impl JointDensity for Shrinkage {
///     fn n_fixed(&self) -> usize { 1 }
///     fn n_random(&self) -> usize { 1 }
///     fn eval<S: Scalar>(&self, fixed: &[S], random: &[S]) -> DensityTerms<S> {
///         let d = random[0] - fixed[0];
///         DensityTerms::smooth_only(d * d / S::from_f64(2.0))
///     }
/// }
///
/// struct Lasso;
/// impl FixedPrior for Lasso {
///     fn n_fixed(&self) -> usize { 1 }
///     fn eval<S: Scalar>(&self, fixed: &[S]) -> DensityTerms<S> {
///         DensityTerms::new(S::zero(), vec![fixed[0]])
///     }
/// }
///
/// let model = LaplaceModel::new(Shrinkage, Lasso).unwrap();
/// let mut nlp = IpoptFixed::new(
///     model, &[-1.0], &[0.5], &[1.0], &[0.0], AdapterConfig::default(),
/// ).unwrap();
/// let sizes = nlp.get_sizes();
/// assert_eq!((sizes.n, sizes.m), (2, 2));
/// ```
#[derive(Debug)]
pub struct IpoptFixed<M> {
    model: M,
    config: AdapterConfig,
    n_fixed: usize,
    n_abs: usize,
    fixed_lower: Vec<f64>,
    fixed_upper: Vec<f64>,
    fixed_in: Vec<f64>,
    random_in: Vec<f64>,
    lower_bound_inf: f64,
    upper_bound_inf: f64,
    prior_jac_pattern: SparsityPattern,
    laplace_hes_pattern: SparsityPattern,
    prior_hes_pattern: SparsityPattern,
    lag_hes: MergedPattern,
    profiled: Option<Profiled>,
    best: BestSoFar,
    state: AdapterState,
    finalize_ok: Option<bool>,
    kkt_report: Option<KktReport>,
    solution: Option<NlpSolution>,
}

impl<M: MixedModel> IpoptFixed<M> {
    /// Build the adapter at the initial point.
    ///
    /// Evaluates the prior, its Jacobian and Hessian, and the Laplace Hessian
    /// once at `(fixed_in, random_in)` to fix the problem shape and the
    /// Lagrangian Hessian structure.
    ///
    /// # Errors
    /// - `InvalidInput` for bad bounds, starting values or configuration
    /// - `ContractViolation` if the model's sizes or structures are inconsistent
    /// - any error of the model evaluations
    pub fn new(
        mut model: M,
        fixed_lower: &[f64],
        fixed_in: &[f64],
        fixed_upper: &[f64],
        random_in: &[f64],
        config: AdapterConfig,
    ) -> Result<Self, OptimiserError> {
        config.validate()?;
        let n_fixed = model.n_fixed();
        let n_random = model.n_random();
        check_buffer("fixed lower bounds", n_fixed, fixed_lower.len())?;
        check_buffer("fixed upper bounds", n_fixed, fixed_upper.len())?;
        check_buffer("initial fixed effects", n_fixed, fixed_in.len())?;
        check_buffer("initial random effects", n_random, random_in.len())?;

        let mut lower_bound_inf = -config.infinity_magnitude;
        let mut upper_bound_inf = config.infinity_magnitude;
        for j in 0..n_fixed {
            let (lo, x, up) = (fixed_lower[j], fixed_in[j], fixed_upper[j]);
            if lo.is_nan() || up.is_nan() || !x.is_finite() || !(lo <= x && x <= up) {
                return Err(OptimiserError::InvalidInput(format!(
                    "fixed effect {}: need lower <= initial <= upper, got {} <= {} <= {}",
                    j, lo, x, up
                )));
            }
            if lo.is_finite() {
                lower_bound_inf = lower_bound_inf.min(lo);
            }
            if up.is_finite() {
                upper_bound_inf = upper_bound_inf.max(up);
            }
        }

        let prior = model.prior_eval(fixed_in)?;
        let n_abs = prior.len().checked_sub(1).ok_or_else(|| {
            OptimiserError::ContractViolation("prior must return its smooth term".to_string())
        })?;

        let prior_jac = model.prior_jac(fixed_in)?;
        if prior_jac.pattern().row_extent() > 1 + n_abs || prior_jac.pattern().col_extent() > n_fixed {
            return Err(OptimiserError::ContractViolation(
                "prior Jacobian entry outside the prior's shape".to_string(),
            ));
        }

        let laplace_hes = model.laplace_hes_fix(fixed_in, random_in)?;
        let prior_hes = model.prior_hes(fixed_in, &vec![1.0; 1 + n_abs])?;
        for (name, hes) in [("Laplace", &laplace_hes), ("prior", &prior_hes)] {
            let pattern = hes.pattern();
            if !pattern.is_lower_triangular() || pattern.row_extent() > n_fixed {
                return Err(OptimiserError::ContractViolation(format!(
                    "{} Hessian must be a lower triangle in fixed-effects space",
                    name
                )));
            }
        }
        let lag_hes = merge_sparse(laplace_hes.pattern(), prior_hes.pattern());

        let adapter = Self {
            model,
            config,
            n_fixed,
            n_abs,
            fixed_lower: fixed_lower.to_vec(),
            fixed_upper: fixed_upper.to_vec(),
            fixed_in: fixed_in.to_vec(),
            random_in: random_in.to_vec(),
            lower_bound_inf,
            upper_bound_inf,
            prior_jac_pattern: prior_jac.pattern().clone(),
            laplace_hes_pattern: laplace_hes.pattern().clone(),
            prior_hes_pattern: prior_hes.pattern().clone(),
            lag_hes,
            profiled: None,
            best: BestSoFar::new(),
            state: AdapterState::Constructed,
            finalize_ok: None,
            kkt_report: None,
            solution: None,
        };
        let sizes = adapter.sizes();
        info!(
            n_fixed,
            n_random,
            n_abs,
            nnz_jac_g = sizes.nnz_jac_g,
            nnz_h_lag = sizes.nnz_h_lag,
            lower_bound_inf,
            upper_bound_inf,
            "fixed-effects NLP constructed"
        );
        Ok(adapter)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The wrapped model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Consume the adapter, returning the model.
    pub fn into_model(self) -> M {
        self.model
    }

    /// Adapter configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Lifecycle state.
    pub fn state(&self) -> AdapterState {
        self.state
    }

    /// Number of absolute-value terms in the prior.
    pub fn n_abs(&self) -> usize {
        self.n_abs
    }

    /// Value reported for an absent lower bound.
    pub fn lower_bound_inf(&self) -> f64 {
        self.lower_bound_inf
    }

    /// Value reported for an absent upper bound.
    pub fn upper_bound_inf(&self) -> f64 {
        self.upper_bound_inf
    }

    /// Incumbent of all objective evaluations.
    pub fn best(&self) -> &BestSoFar {
        &self.best
    }

    /// Outcome of the finalisation KKT check; `None` before finalisation.
    pub fn finalize_ok(&self) -> Option<bool> {
        self.finalize_ok
    }

    /// Report of the finalisation KKT check, if it could be computed.
    pub fn kkt_report(&self) -> Option<&KktReport> {
        self.kkt_report.as_ref()
    }

    /// Solution passed to `finalize_solution`.
    pub fn solution(&self) -> Option<&NlpSolution> {
        self.solution.as_ref()
    }

    /// Fixed effects of the finalised solution.
    pub fn fixed_solution(&self) -> Option<&[f64]> {
        self.solution.as_ref().map(|s| &s.x[..self.n_fixed.min(s.x.len())])
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn sizes(&self) -> NlpSizes {
        let jac_prior = self.prior_jac_pattern.rows().iter().filter(|&&r| r >= 1).count();
        NlpSizes {
            n: self.n_fixed + self.n_abs,
            m: 2 * self.n_abs,
            nnz_jac_g: 2 * jac_prior + 2 * self.n_abs,
            nnz_h_lag: self.lag_hes.pattern.len(),
        }
    }

    fn begin_evaluation(&mut self) -> Result<(), OptimiserError> {
        if self.state == AdapterState::Finalized {
            return Err(OptimiserError::InvalidState(
                "evaluation requested after finalize_solution".to_string(),
            ));
        }
        self.state = AdapterState::Evaluating;
        Ok(())
    }

    fn split<'x>(&self, x: &'x [f64]) -> Result<(&'x [f64], &'x [f64]), OptimiserError> {
        check_buffer("NLP variables", self.n_fixed + self.n_abs, x.len())?;
        Ok(x.split_at(self.n_fixed))
    }

    /// Random effects profiled at `fixed`, re-optimised when the point changed.
    fn profiled_random(&mut self, fixed: &[f64], new_x: bool) -> Result<Vec<f64>, OptimiserError> {
        if let Some(profiled) = &self.profiled {
            if !new_x && same_bits(&profiled.fixed, fixed) {
                return Ok(profiled.random.clone());
            }
        }
        let (start, warm_start) = if self.best.is_set() {
            (self.best.random().to_vec(), "incumbent")
        } else {
            (self.random_in.clone(), "initial")
        };
        debug!(warm_start, "profiling random effects");
        let random = self.model.optimize_random(fixed, &start)?;
        self.profiled = Some(Profiled {
            fixed: fixed.to_vec(),
            random: random.clone(),
        });
        Ok(random)
    }

    fn prior_values(&mut self, fixed: &[f64]) -> Result<Vec<f64>, OptimiserError> {
        let prior = self.model.prior_eval(fixed)?;
        check_buffer("prior terms", 1 + self.n_abs, prior.len())?;
        Ok(prior)
    }

    fn checked_pattern(
        matrix: &SparseMatrix,
        established: &SparsityPattern,
        name: &str,
    ) -> Result<(), OptimiserError> {
        if matrix.pattern() != established {
            return Err(OptimiserError::ContractViolation(format!(
                "{} sparsity changed since construction",
                name
            )));
        }
        Ok(())
    }

    fn try_bounds(&self, x_l: &mut [f64], x_u: &mut [f64], g_l: &mut [f64], g_u: &mut [f64]) -> Result<(), OptimiserError> {
        let sizes = self.sizes();
        check_buffer("x_l", sizes.n, x_l.len())?;
        check_buffer("x_u", sizes.n, x_u.len())?;
        check_buffer("g_l", sizes.m, g_l.len())?;
        check_buffer("g_u", sizes.m, g_u.len())?;
        for j in 0..self.n_fixed {
            x_l[j] = if self.fixed_lower[j].is_finite() {
                self.fixed_lower[j]
            } else {
                self.lower_bound_inf
            };
            x_u[j] = if self.fixed_upper[j].is_finite() {
                self.fixed_upper[j]
            } else {
                self.upper_bound_inf
            };
        }
        x_l[self.n_fixed..].fill(self.lower_bound_inf);
        x_u[self.n_fixed..].fill(self.upper_bound_inf);
        g_l.fill(0.0);
        g_u.fill(self.upper_bound_inf);
        Ok(())
    }

    fn try_starting_point(&mut self, x: &mut [f64]) -> Result<(), OptimiserError> {
        check_buffer("starting point", self.n_fixed + self.n_abs, x.len())?;
        let fixed_in = self.fixed_in.clone();
        let prior = self.prior_values(&fixed_in)?;
        x[..self.n_fixed].copy_from_slice(&fixed_in);
        for (s, a) in x[self.n_fixed..].iter_mut().zip(&prior[1..]) {
            *s = a.abs();
        }
        Ok(())
    }

    fn try_eval_f(&mut self, x: &[f64], new_x: bool) -> Result<f64, OptimiserError> {
        self.begin_evaluation()?;
        let (fixed, slack) = self.split(x)?;
        let random = self.profiled_random(fixed, new_x)?;
        let laplace = self.model.laplace_eval(fixed, fixed, &random)?;
        let prior = self.prior_values(fixed)?;

        let relaxed = laplace + prior[0] + slack.iter().sum::<f64>();
        let objective = laplace + prior[0] + prior[1..].iter().map(|a| a.abs()).sum::<f64>();
        if !relaxed.is_finite() || !objective.is_finite() {
            return Err(OptimiserError::NonFinite { context: "objective" });
        }
        if self.best.offer(fixed, &random, objective) {
            debug!(objective, "incumbent improved");
        }
        Ok(relaxed)
    }

    fn try_eval_grad_f(&mut self, x: &[f64], new_x: bool, grad_f: &mut [f64]) -> Result<(), OptimiserError> {
        self.begin_evaluation()?;
        check_buffer("objective gradient", x.len(), grad_f.len())?;
        let (fixed, _) = self.split(x)?;
        let random = self.profiled_random(fixed, new_x)?;
        let laplace = self.model.laplace_grad_fix(fixed, &random)?;
        check_buffer("Laplace gradient", self.n_fixed, laplace.len())?;
        let jac = self.model.prior_jac(fixed)?;
        Self::checked_pattern(&jac, &self.prior_jac_pattern, "prior Jacobian")?;

        grad_f[..self.n_fixed].copy_from_slice(&laplace);
        for (r, c, v) in jac.triplets() {
            if r == 0 {
                grad_f[c] += v;
            }
        }
        grad_f[self.n_fixed..].fill(1.0);
        Ok(())
    }

    fn try_eval_g(&mut self, x: &[f64], g: &mut [f64]) -> Result<(), OptimiserError> {
        self.begin_evaluation()?;
        check_buffer("constraints", 2 * self.n_abs, g.len())?;
        let (fixed, slack) = self.split(x)?;
        let prior = self.prior_values(fixed)?;
        for (j, (&s, &a)) in slack.iter().zip(&prior[1..]).enumerate() {
            g[2 * j] = s - a;
            g[2 * j + 1] = s + a;
        }
        Ok(())
    }

    fn try_jac_g_structure(&self, rows: &mut [usize], cols: &mut [usize]) -> Result<(), OptimiserError> {
        let nnz = self.sizes().nnz_jac_g;
        check_buffer("Jacobian rows", nnz, rows.len())?;
        check_buffer("Jacobian cols", nnz, cols.len())?;
        let mut k = 0;
        for (r, c) in self.prior_jac_pattern.iter().filter(|&(r, _)| r >= 1) {
            rows[k] = 2 * (r - 1);
            cols[k] = c;
            rows[k + 1] = 2 * (r - 1) + 1;
            cols[k + 1] = c;
            k += 2;
        }
        for j in 0..self.n_abs {
            rows[k] = 2 * j;
            cols[k] = self.n_fixed + j;
            rows[k + 1] = 2 * j + 1;
            cols[k + 1] = self.n_fixed + j;
            k += 2;
        }
        Ok(())
    }

    fn try_eval_jac_g(&mut self, x: &[f64], values: &mut [f64]) -> Result<(), OptimiserError> {
        self.begin_evaluation()?;
        check_buffer("Jacobian values", self.sizes().nnz_jac_g, values.len())?;
        let (fixed, _) = self.split(x)?;
        let jac = self.model.prior_jac(fixed)?;
        Self::checked_pattern(&jac, &self.prior_jac_pattern, "prior Jacobian")?;
        let mut k = 0;
        for (r, _, v) in jac.triplets() {
            if r >= 1 {
                values[k] = -v;
                values[k + 1] = v;
                k += 2;
            }
        }
        values[k..].fill(1.0);
        Ok(())
    }

    fn try_hess_structure(&self, rows: &mut [usize], cols: &mut [usize]) -> Result<(), OptimiserError> {
        let pattern = &self.lag_hes.pattern;
        check_buffer("Hessian rows", pattern.len(), rows.len())?;
        check_buffer("Hessian cols", pattern.len(), cols.len())?;
        rows.copy_from_slice(pattern.rows());
        cols.copy_from_slice(pattern.cols());
        Ok(())
    }

    fn try_eval_h(
        &mut self,
        x: &[f64],
        new_x: bool,
        obj_factor: f64,
        lambda: &[f64],
        values: &mut [f64],
    ) -> Result<(), OptimiserError> {
        self.begin_evaluation()?;
        check_buffer("Hessian values", self.lag_hes.pattern.len(), values.len())?;
        check_buffer("constraint multipliers", 2 * self.n_abs, lambda.len())?;
        let (fixed, _) = self.split(x)?;
        let random = self.profiled_random(fixed, new_x)?;

        let laplace = self.model.laplace_hes_fix(fixed, &random)?;
        Self::checked_pattern(&laplace, &self.laplace_hes_pattern, "Laplace Hessian")?;
        let scaled: Vec<f64> = laplace.values().iter().map(|v| obj_factor * v).collect();

        let mut weights = Vec::with_capacity(1 + self.n_abs);
        weights.push(obj_factor);
        weights.extend((0..self.n_abs).map(|j| lambda[2 * j + 1] - lambda[2 * j]));
        let prior = self.model.prior_hes(fixed, &weights)?;
        Self::checked_pattern(&prior, &self.prior_hes_pattern, "prior Hessian")?;

        self.lag_hes.accumulate(&scaled, prior.values(), values);
        Ok(())
    }
}

impl<M: MixedModel> NlpProblem for IpoptFixed<M> {
    fn get_sizes(&mut self) -> NlpSizes {
        self.sizes()
    }

    fn get_bounds(&mut self, x_l: &mut [f64], x_u: &mut [f64], g_l: &mut [f64], g_u: &mut [f64]) -> bool {
        report("get_bounds", self.try_bounds(x_l, x_u, g_l, g_u)).is_some()
    }

    fn get_starting_point(&mut self, x: &mut [f64]) -> bool {
        report("get_starting_point", self.try_starting_point(x)).is_some()
    }

    fn eval_f(&mut self, x: &[f64], new_x: bool, obj_value: &mut f64) -> bool {
        match report("eval_f", self.try_eval_f(x, new_x)) {
            Some(value) => {
                *obj_value = value;
                true
            }
            None => false,
        }
    }

    fn eval_grad_f(&mut self, x: &[f64], new_x: bool, grad_f: &mut [f64]) -> bool {
        report("eval_grad_f", self.try_eval_grad_f(x, new_x, grad_f)).is_some()
    }

    fn eval_g(&mut self, x: &[f64], _new_x: bool, g: &mut [f64]) -> bool {
        report("eval_g", self.try_eval_g(x, g)).is_some()
    }

    fn jac_g_structure(&mut self, rows: &mut [usize], cols: &mut [usize]) -> bool {
        report("jac_g_structure", self.try_jac_g_structure(rows, cols)).is_some()
    }

    fn eval_jac_g(&mut self, x: &[f64], _new_x: bool, values: &mut [f64]) -> bool {
        report("eval_jac_g", self.try_eval_jac_g(x, values)).is_some()
    }

    fn hess_structure(&mut self, rows: &mut [usize], cols: &mut [usize]) -> bool {
        report("hess_structure", self.try_hess_structure(rows, cols)).is_some()
    }

    fn eval_h(
        &mut self,
        x: &[f64],
        new_x: bool,
        obj_factor: f64,
        lambda: &[f64],
        _new_lambda: bool,
        values: &mut [f64],
    ) -> bool {
        report("eval_h", self.try_eval_h(x, new_x, obj_factor, lambda, values)).is_some()
    }

    fn finalize_solution(&mut self, solution: &NlpSolution) {
        let tolerance = self.config.finalize_tolerance();
        let ok = match check_kkt(self, solution, tolerance) {
            Ok(kkt) => {
                let ok = kkt.ok();
                if ok {
                    info!(status = %solution.status, "solution passed the KKT check");
                } else {
                    warn!(
                        status = %solution.status,
                        bound = kkt.bound_violation,
                        multiplier = kkt.multiplier_violation,
                        constraint = kkt.constraint_violation,
                        stationarity = kkt.stationarity,
                        tolerance,
                        "solution failed the KKT check"
                    );
                }
                self.kkt_report = Some(kkt);
                ok
            }
            Err(error) => {
                warn!(status = %solution.status, %error, "KKT check could not be evaluated");
                false
            }
        };
        self.finalize_ok = Some(ok);
        self.solution = Some(solution.clone());
        self.state = AdapterState::Finalized;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_so_far_strict_improvement() {
        let mut best = BestSoFar::new();
        assert!(!best.is_set());
        assert!(best.offer(&[1.0], &[0.5], 3.0));
        assert!(!best.offer(&[2.0], &[0.7], 3.0));
        assert_eq!(best.fixed(), &[1.0]);
        assert!(best.offer(&[2.0], &[0.7], 2.5));
        assert!(!best.offer(&[3.0], &[0.9], 4.0));
        assert_eq!(best.objective(), 2.5);
        assert_eq!(best.random(), &[0.7]);
    }

    #[test]
    fn test_best_so_far_ignores_nan() {
        let mut best = BestSoFar::new();
        assert!(!best.offer(&[1.0], &[], f64::NAN));
        assert!(!best.is_set());
    }

    #[test]
    fn test_same_bits() {
        assert!(same_bits(&[1.0, -0.0], &[1.0, -0.0]));
        assert!(!same_bits(&[0.0], &[-0.0]));
        assert!(!same_bits(&[1.0], &[1.0, 2.0]));
    }
}
