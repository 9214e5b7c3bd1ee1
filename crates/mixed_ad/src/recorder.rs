//! # Differentiation Recorder
//!
//! Builds derivative recordings of a [`JointDensity`] `f(θ, u)` at a point.
//! Every call records the density afresh; nothing is updated incrementally.
//!
//! | Operation | Result | Index space | Order |
//! |-----------|--------|-------------|-------|
//! | [`Recorder::record_gradient`] | `∂f/∂u` as a new recording over `(θ, u)` | - | - |
//! | [`Recorder::record_hes_ran`] | lower triangle of `f_uu` | `u`-local | column-major |
//! | [`Recorder::record_hes_cross`] | `f_uθ` | rows `u`-local, cols `θ` | row-major |
//! | [`Recorder::record_hessian`] | rows `≥ n_fixed`, `col ≤ row` of the full Hessian | `(θ, u)` | row-major |
//! | [`Recorder::record_hes_fix`] | lower triangle of `f_θθ` | `θ` | row-major |
//!
//! ## Established-once sparsity
//!
//! The sparsity of each Hessian block is found on its first call by forward
//! and reverse structural passes, then kept. Later calls recompute it and
//! must find the same pattern; a different pattern means the density's
//! structure depends on the evaluation point, which is a model defect and is
//! reported as [`AdError::ContractViolation`]. [`Recorder::invalidate`]
//! forgets every established pattern.

use crate::density::JointDensity;
use crate::error::AdError;
use crate::plan::HessianPlan;
use crate::tape::{Recording, TapeVar};
use mixed_core::sparsity::{SparseMatrix, SparsityPattern};
use mixed_core::types::Scalar;
use num_dual::DualNum;
use num_traits::One;
use std::ops::Range;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    HesRan,
    HesCross,
    Hessian,
    HesFix,
}

struct BlockSpec {
    seeds: Range<usize>,
    rows: Range<usize>,
    cols: Range<usize>,
    lower: bool,
    column_major: bool,
    row_offset: usize,
    col_offset: usize,
}

impl Block {
    fn name(self) -> &'static str {
        match self {
            Block::HesRan => "hes_ran",
            Block::HesCross => "hes_cross",
            Block::Hessian => "hessian",
            Block::HesFix => "hes_fix",
        }
    }

    fn spec(self, n_fixed: usize, n_random: usize) -> BlockSpec {
        let fixed = 0..n_fixed;
        let random = n_fixed..n_fixed + n_random;
        match self {
            Block::HesRan => BlockSpec {
                seeds: random.clone(),
                rows: random.clone(),
                cols: random,
                lower: true,
                column_major: true,
                row_offset: n_fixed,
                col_offset: n_fixed,
            },
            Block::HesCross => BlockSpec {
                seeds: fixed.clone(),
                rows: random,
                cols: fixed,
                lower: false,
                column_major: false,
                row_offset: n_fixed,
                col_offset: 0,
            },
            Block::Hessian => BlockSpec {
                seeds: 0..n_fixed + n_random,
                rows: random,
                cols: 0..n_fixed + n_random,
                lower: true,
                column_major: false,
                row_offset: 0,
                col_offset: 0,
            },
            Block::HesFix => BlockSpec {
                seeds: fixed.clone(),
                rows: fixed.clone(),
                cols: fixed,
                lower: true,
                column_major: false,
                row_offset: 0,
                col_offset: 0,
            },
        }
    }
}

/// Established pattern of one Hessian block with the plan and recording of
/// its most recent call.
#[derive(Debug, Clone)]
struct HessianRecord {
    pattern: SparsityPattern,
    plan: HessianPlan,
    recording: Recording,
}

/// Recording of `∂f/∂u` as a function of `(θ, u)`.
///
/// Being itself a [`Recording`], it can be evaluated with any [`Scalar`],
/// including tape variables to record higher derivatives.
#[derive(Debug, Clone)]
pub struct GradientRecording {
    recording: Recording,
    n_fixed: usize,
    n_random: usize,
}

impl GradientRecording {
    /// `∂f/∂u` at `(fixed, random)`.
    pub fn eval<S: Scalar>(&self, fixed: &[S], random: &[S]) -> Result<Vec<S>, AdError> {
        if fixed.len() != self.n_fixed {
            return Err(AdError::size("gradient fixed effects", self.n_fixed, fixed.len()));
        }
        if random.len() != self.n_random {
            return Err(AdError::size("gradient random effects", self.n_random, random.len()));
        }
        let point: Vec<S> = fixed.iter().chain(random).copied().collect();
        self.recording.eval(&point)
    }

    /// Underlying recording; independents are `(θ, u)`, outputs `∂f/∂u`.
    pub fn recording(&self) -> &Recording {
        &self.recording
    }
}

/// Derivative recorder for a joint density.
#[derive(Debug)]
pub struct Recorder<J> {
    density: J,
    n_fixed: usize,
    n_random: usize,
    hes_ran: Option<HessianRecord>,
    hes_cross: Option<HessianRecord>,
    hessian: Option<HessianRecord>,
    hes_fix: Option<HessianRecord>,
}

impl<J: JointDensity> Recorder<J> {
    /// Recorder for `density`; no pattern is established yet.
    pub fn new(density: J) -> Self {
        let n_fixed = density.n_fixed();
        let n_random = density.n_random();
        Self {
            density,
            n_fixed,
            n_random,
            hes_ran: None,
            hes_cross: None,
            hessian: None,
            hes_fix: None,
        }
    }

    /// The joint density.
    pub fn density(&self) -> &J {
        &self.density
    }

    /// Number of fixed effects.
    pub fn n_fixed(&self) -> usize {
        self.n_fixed
    }

    /// Number of random effects.
    pub fn n_random(&self) -> usize {
        self.n_random
    }

    /// Forget all established sparsity patterns.
    pub fn invalidate(&mut self) {
        self.hes_ran = None;
        self.hes_cross = None;
        self.hessian = None;
        self.hes_fix = None;
    }

    /// Established random-Hessian pattern, if any.
    pub fn hes_ran_pattern(&self) -> Option<&SparsityPattern> {
        self.hes_ran.as_ref().map(|r| &r.pattern)
    }

    /// Established cross-Hessian pattern, if any.
    pub fn hes_cross_pattern(&self) -> Option<&SparsityPattern> {
        self.hes_cross.as_ref().map(|r| &r.pattern)
    }

    fn point<S: Copy>(&self, fixed: &[S], random: &[S]) -> Result<Vec<S>, AdError> {
        if fixed.len() != self.n_fixed {
            return Err(AdError::size("fixed effects", self.n_fixed, fixed.len()));
        }
        if random.len() != self.n_random {
            return Err(AdError::size("random effects", self.n_random, random.len()));
        }
        Ok(fixed.iter().chain(random).copied().collect())
    }

    fn record_joint(&self, point: &[f64]) -> Recording {
        let n_fixed = self.n_fixed;
        let density = &self.density;
        Recording::record(point, |v| {
            let (fixed, random) = v.split_at(n_fixed);
            vec![density.value(fixed, random)]
        })
    }

    /// `f(θ, u)`.
    pub fn joint_value(&self, fixed: &[f64], random: &[f64]) -> Result<f64, AdError> {
        self.point(fixed, random)?;
        let f = self.density.value(fixed, random);
        if !f.is_finite() {
            return Err(AdError::NonFinite {
                context: "joint density",
            });
        }
        Ok(f)
    }

    /// Full gradient of `f` with respect to `(θ, u)`.
    pub fn joint_gradient(&self, fixed: &[f64], random: &[f64]) -> Result<Vec<f64>, AdError> {
        let point = self.point(fixed, random)?;
        let grad = self.record_joint(&point).gradient(&point, &[1.0])?;
        if grad.iter().any(|g| !g.is_finite()) {
            return Err(AdError::NonFinite {
                context: "joint gradient",
            });
        }
        Ok(grad)
    }

    /// Record `∂f/∂u` at `(θ, u)`.
    ///
    /// The density is recorded over `(θ, u)`, swept in reverse for the
    /// random-effect adjoints, and that sweep is itself recorded on a new
    /// tape, so the result stays differentiable in both `θ` and `u`.
    pub fn record_gradient(&self, fixed: &[f64], random: &[f64]) -> Result<GradientRecording, AdError> {
        let point = self.point(fixed, random)?;
        let joint = self.record_joint(&point);
        let n_fixed = self.n_fixed;
        let recording = Recording::record(&point, |v| {
            let values = joint.forward(v);
            let grad = joint.reverse(&values, &[TapeVar::one()]);
            grad[n_fixed..].to_vec()
        });
        Ok(GradientRecording {
            recording,
            n_fixed: self.n_fixed,
            n_random: self.n_random,
        })
    }

    /// Lower triangle of `f_uu`, `u`-local indices, sorted by column then row.
    pub fn record_hes_ran(&mut self, fixed: &[f64], random: &[f64]) -> Result<SparseMatrix, AdError> {
        self.record_block(Block::HesRan, fixed, random)
    }

    /// Cross Hessian `f_uθ`: rows `u`-local, columns `θ`, row-major.
    pub fn record_hes_cross(&mut self, fixed: &[f64], random: &[f64]) -> Result<SparseMatrix, AdError> {
        self.record_block(Block::HesCross, fixed, random)
    }

    /// Hessian of `f` over `(θ, u)` restricted to rows `≥ n_fixed` and
    /// `col ≤ row`, row-major. The `θθ` block is not included.
    pub fn record_hessian(&mut self, fixed: &[f64], random: &[f64]) -> Result<SparseMatrix, AdError> {
        self.record_block(Block::Hessian, fixed, random)
    }

    /// Lower triangle of `f_θθ`, row-major.
    pub fn record_hes_fix(&mut self, fixed: &[f64], random: &[f64]) -> Result<SparseMatrix, AdError> {
        self.record_block(Block::HesFix, fixed, random)
    }

    /// Refill the most recently recorded random Hessian at a new point.
    ///
    /// Values are returned in the established pattern order. With num-dual
    /// inputs each value carries the corresponding directional derivative.
    pub fn hes_ran_eval<S>(&self, fixed: &[S], random: &[S]) -> Result<Vec<S>, AdError>
    where
        S: DualNum<f64> + Copy,
    {
        let record = self.hes_ran.as_ref().ok_or_else(|| {
            AdError::ContractViolation("random Hessian evaluated before it was recorded".to_string())
        })?;
        let point = self.point(fixed, random)?;
        record.plan.eval(&record.recording, &point, &[S::one()])
    }

    fn slot(&mut self, block: Block) -> &mut Option<HessianRecord> {
        match block {
            Block::HesRan => &mut self.hes_ran,
            Block::HesCross => &mut self.hes_cross,
            Block::Hessian => &mut self.hessian,
            Block::HesFix => &mut self.hes_fix,
        }
    }

    fn record_block(&mut self, block: Block, fixed: &[f64], random: &[f64]) -> Result<SparseMatrix, AdError> {
        let point = self.point(fixed, random)?;
        let recording = self.record_joint(&point);
        let spec = block.spec(self.n_fixed, self.n_random);
        let seeds: Vec<usize> = spec.seeds.clone().collect();
        let hes = recording.hes_sparsity(&seeds, &[true]);

        let mut entries = Vec::new();
        for r in spec.rows.clone() {
            for &c in &hes[r] {
                if spec.cols.contains(&c) && (!spec.lower || c <= r) {
                    entries.push((r, c));
                }
            }
        }
        if spec.column_major {
            entries.sort_by_key(|&(r, c)| (c, r));
        } else {
            entries.sort_unstable();
        }
        let (rows, cols): (Vec<usize>, Vec<usize>) = entries
            .iter()
            .map(|&(r, c)| (r - spec.row_offset, c - spec.col_offset))
            .unzip();
        let pattern = SparsityPattern::new(rows, cols)?;

        match self.slot(block) {
            Some(established) if established.pattern != pattern => {
                return Err(AdError::ContractViolation(format!(
                    "{} sparsity changed between calls: {} entries established, {} found",
                    block.name(),
                    established.pattern.len(),
                    pattern.len()
                )));
            }
            Some(_) => {}
            None => debug!(
                block = block.name(),
                nnz = pattern.len(),
                "sparsity pattern established"
            ),
        }

        let plan = HessianPlan::new(&hes, entries);
        let values = plan.eval(&recording, &point, &[1.0])?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AdError::NonFinite {
                context: block.name(),
            });
        }
        *self.slot(block) = Some(HessianRecord {
            pattern: pattern.clone(),
            plan,
            recording,
        });
        Ok(SparseMatrix::new(pattern, values)?)
    }
}
