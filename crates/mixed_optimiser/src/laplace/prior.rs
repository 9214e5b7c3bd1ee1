//! Recorded derivatives of a fixed-effects prior.

use crate::error::OptimiserError;
use crate::model::FixedPrior;
use mixed_ad::{HessianPlan, JacobianPlan, Recording};
use mixed_core::sparsity::{SparseMatrix, SparsityPattern};
use tracing::debug;

/// Prior evaluator with sparse Jacobian and Hessian plans.
///
/// The prior is recorded at each call; the Jacobian and Hessian patterns are
/// established on first use and must not change afterwards.
#[derive(Debug)]
pub struct PriorRecorder<P> {
    prior: P,
    n_outputs: Option<usize>,
    jac: Option<(SparsityPattern, JacobianPlan)>,
    hes: Option<(SparsityPattern, HessianPlan)>,
}

impl<P: FixedPrior> PriorRecorder<P> {
    /// Wrap `prior`; nothing is recorded yet.
    pub fn new(prior: P) -> Self {
        Self {
            prior,
            n_outputs: None,
            jac: None,
            hes: None,
        }
    }

    /// The wrapped prior.
    pub fn prior(&self) -> &P {
        &self.prior
    }

    fn check_outputs(&mut self, n_outputs: usize) -> Result<(), OptimiserError> {
        match self.n_outputs {
            Some(n) if n != n_outputs => Err(OptimiserError::ContractViolation(format!(
                "prior produced {} terms, previously {}",
                n_outputs, n
            ))),
            Some(_) => Ok(()),
            None => {
                self.n_outputs = Some(n_outputs);
                Ok(())
            }
        }
    }

    fn record(&mut self, fixed: &[f64]) -> Result<Recording, OptimiserError> {
        if fixed.len() != self.prior.n_fixed() {
            return Err(OptimiserError::size("prior fixed effects", self.prior.n_fixed(), fixed.len()));
        }
        let prior = &self.prior;
        let recording = Recording::record(fixed, |v| prior.eval(v).to_vec());
        self.check_outputs(recording.n_outputs())?;
        Ok(recording)
    }

    /// `[smooth, abs_1 … abs_k]` at `fixed`.
    pub fn eval(&mut self, fixed: &[f64]) -> Result<Vec<f64>, OptimiserError> {
        if fixed.len() != self.prior.n_fixed() {
            return Err(OptimiserError::size("prior fixed effects", self.prior.n_fixed(), fixed.len()));
        }
        let values = self.prior.eval(fixed).to_vec();
        self.check_outputs(values.len())?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(OptimiserError::NonFinite { context: "prior" });
        }
        Ok(values)
    }

    /// Jacobian of the prior terms, row-major.
    pub fn jac(&mut self, fixed: &[f64]) -> Result<SparseMatrix, OptimiserError> {
        let recording = self.record(fixed)?;
        let seeds: Vec<usize> = (0..fixed.len()).collect();
        let jac = recording.jac_sparsity(&seeds);
        let entries: Vec<(usize, usize)> = jac
            .iter()
            .enumerate()
            .flat_map(|(r, cols)| cols.iter().map(move |&c| (r, c)))
            .collect();
        let pattern = SparsityPattern::from_pairs(entries.iter().copied())?;

        match &self.jac {
            Some((established, _)) if *established != pattern => {
                return Err(OptimiserError::ContractViolation(
                    "prior Jacobian sparsity changed between calls".to_string(),
                ));
            }
            Some(_) => {}
            None => {
                debug!(nnz = pattern.len(), "prior Jacobian pattern established");
                let plan = JacobianPlan::new(&jac, fixed.len(), entries);
                self.jac = Some((pattern.clone(), plan));
            }
        }
        let values = match &self.jac {
            Some((_, plan)) => plan.eval(&recording, fixed)?,
            None => Vec::new(),
        };
        finite(&values, "prior Jacobian")?;
        Ok(SparseMatrix::new(pattern, values)?)
    }

    /// Lower triangle of the Hessian of `Σ_k w_k prior_k`, row-major.
    pub fn hes(&mut self, fixed: &[f64], weights: &[f64]) -> Result<SparseMatrix, OptimiserError> {
        let recording = self.record(fixed)?;
        if weights.len() != recording.n_outputs() {
            return Err(OptimiserError::size("prior Hessian weights", recording.n_outputs(), weights.len()));
        }
        let seeds: Vec<usize> = (0..fixed.len()).collect();
        let hes = recording.hes_sparsity(&seeds, &vec![true; weights.len()]);
        let entries: Vec<(usize, usize)> = hes
            .iter()
            .enumerate()
            .flat_map(|(r, cols)| cols.iter().filter(move |&&c| c <= r).map(move |&c| (r, c)))
            .collect();
        let pattern = SparsityPattern::from_pairs(entries.iter().copied())?;

        match &self.hes {
            Some((established, _)) if *established != pattern => {
                return Err(OptimiserError::ContractViolation(
                    "prior Hessian sparsity changed between calls".to_string(),
                ));
            }
            Some(_) => {}
            None => {
                debug!(nnz = pattern.len(), "prior Hessian pattern established");
                let plan = HessianPlan::new(&hes, entries);
                self.hes = Some((pattern.clone(), plan));
            }
        }
        let values = match &self.hes {
            Some((_, plan)) => plan.eval(&recording, fixed, weights)?,
            None => Vec::new(),
        };
        finite(&values, "prior Hessian")?;
        Ok(SparseMatrix::new(pattern, values)?)
    }
}

fn finite(values: &[f64], context: &'static str) -> Result<(), OptimiserError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(OptimiserError::NonFinite { context })
    }
}
