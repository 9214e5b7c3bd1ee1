//! Colored evaluation plans for sparse Jacobians and Hessians.
//!
//! A plan is built once from a sparsity pattern and then reused to fill the
//! requested entries at any number of points. Columns that never share a
//! row are grouped into one color, so the number of sweeps is the number of
//! colors rather than the number of columns.
//!
//! - [`JacobianPlan`]: one forward sweep with `Dual64` inputs per color.
//! - [`HessianPlan`]: one forward-over-reverse sweep with `Dual<S, f64>`
//!   inputs per color. With `S = f64` this gives Hessian values; with
//!   `S = Dual64` each value also carries its directional derivative.

use crate::error::AdError;
use crate::sparsity::IndexSets;
use crate::tape::Recording;
use num_dual::{Dual, Dual64, DualNum};
use std::collections::BTreeSet;

/// Greedy column coloring.
///
/// `rows` lists, for each row that has requested entries, the set of columns
/// that may be nonzero in that row. Two columns of `columns` receive the same
/// color only if no listed row contains both.
fn color_columns<'a, I>(columns: &BTreeSet<usize>, rows: I) -> (Vec<Vec<usize>>, Vec<usize>)
where
    I: IntoIterator<Item = &'a BTreeSet<usize>> + Clone,
{
    let max_col = columns.iter().next_back().map_or(0, |&c| c + 1);
    let mut color_of = vec![usize::MAX; max_col];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for &c in columns {
        let mut forbidden = BTreeSet::new();
        for row in rows.clone() {
            if row.contains(&c) {
                forbidden.extend(
                    row.iter()
                        .filter(|&&other| other < max_col && color_of[other] != usize::MAX)
                        .map(|&other| color_of[other]),
                );
            }
        }
        let color = (0..).find(|k| !forbidden.contains(k)).unwrap_or(groups.len());
        if color == groups.len() {
            groups.push(Vec::new());
        }
        groups[color].push(c);
        color_of[c] = color;
    }
    (groups, color_of)
}

// =============================================================================
// HessianPlan
// =============================================================================

/// Plan for filling selected entries of the Hessian of `sum_k w_k y_k`.
#[derive(Debug, Clone, PartialEq)]
pub struct HessianPlan {
    entries: Vec<(usize, usize)>,
    colors: Vec<Vec<usize>>,
    entry_color: Vec<usize>,
    n_independent: usize,
}

impl HessianPlan {
    /// Build a plan for `entries` (row, col) in independent-variable space.
    ///
    /// `hes` is the Hessian sparsity returned by [`Recording::hes_sparsity`];
    /// every entry column must be among the seeded columns of that call.
    pub fn new(hes: &IndexSets, entries: Vec<(usize, usize)>) -> Self {
        let columns: BTreeSet<usize> = entries.iter().map(|&(_, c)| c).collect();
        let rows: BTreeSet<usize> = entries.iter().map(|&(r, _)| r).collect();
        let row_sets: Vec<&BTreeSet<usize>> = rows.iter().map(|&r| &hes[r]).collect();
        let (colors, color_of) = color_columns(&columns, row_sets.iter().copied());
        let entry_color = entries.iter().map(|&(_, c)| color_of[c]).collect();
        Self {
            entries,
            colors,
            entry_color,
            n_independent: hes.len(),
        }
    }

    /// Requested entries in output order.
    pub fn entries(&self) -> &[(usize, usize)] {
        &self.entries
    }

    /// Number of forward-over-reverse sweeps per evaluation.
    pub fn n_colors(&self) -> usize {
        self.colors.len()
    }

    /// Fill the requested entries at `x` for output weights `weights`.
    pub fn eval<S>(&self, recording: &Recording, x: &[S], weights: &[S]) -> Result<Vec<S>, AdError>
    where
        S: DualNum<f64> + Copy,
    {
        if x.len() != self.n_independent || x.len() != recording.n_independent() {
            return Err(AdError::size("Hessian plan arguments", self.n_independent, x.len()));
        }
        if weights.len() != recording.n_outputs() {
            return Err(AdError::size("Hessian plan weights", recording.n_outputs(), weights.len()));
        }
        let wd: Vec<Dual<S, f64>> = weights.iter().map(|&w| Dual::new(w, S::zero())).collect();
        let mut out = vec![S::zero(); self.entries.len()];

        for (color, columns) in self.colors.iter().enumerate() {
            let mut xd: Vec<Dual<S, f64>> = x.iter().map(|&xi| Dual::new(xi, S::zero())).collect();
            for &c in columns {
                xd[c].eps = S::one();
            }
            let values = recording.forward(&xd);
            let grad = recording.reverse(&values, &wd);
            for (k, &(r, _)) in self.entries.iter().enumerate() {
                if self.entry_color[k] == color {
                    out[k] = grad[r].eps;
                }
            }
        }
        Ok(out)
    }
}

// =============================================================================
// JacobianPlan
// =============================================================================

/// Plan for filling selected entries of the Jacobian of a recording.
#[derive(Debug, Clone, PartialEq)]
pub struct JacobianPlan {
    entries: Vec<(usize, usize)>,
    colors: Vec<Vec<usize>>,
    entry_color: Vec<usize>,
    n_independent: usize,
}

impl JacobianPlan {
    /// Build a plan for `entries` (output row, independent col).
    ///
    /// `jac` is the output sparsity returned by [`Recording::jac_sparsity`].
    pub fn new(jac: &IndexSets, n_independent: usize, entries: Vec<(usize, usize)>) -> Self {
        let columns: BTreeSet<usize> = entries.iter().map(|&(_, c)| c).collect();
        let (colors, color_of) = color_columns(&columns, jac.iter());
        let entry_color = entries.iter().map(|&(_, c)| color_of[c]).collect();
        Self {
            entries,
            colors,
            entry_color,
            n_independent,
        }
    }

    /// Requested entries in output order.
    pub fn entries(&self) -> &[(usize, usize)] {
        &self.entries
    }

    /// Number of forward sweeps per evaluation.
    pub fn n_colors(&self) -> usize {
        self.colors.len()
    }

    /// Fill the requested entries at `x`.
    pub fn eval(&self, recording: &Recording, x: &[f64]) -> Result<Vec<f64>, AdError> {
        if x.len() != self.n_independent || x.len() != recording.n_independent() {
            return Err(AdError::size("Jacobian plan arguments", self.n_independent, x.len()));
        }
        let mut out = vec![0.0; self.entries.len()];
        for (color, columns) in self.colors.iter().enumerate() {
            let mut xd: Vec<Dual64> = x.iter().map(|&xi| Dual64::from_re(xi)).collect();
            for &c in columns {
                xd[c].eps = 1.0;
            }
            let y = recording.eval(&xd)?;
            for (k, &(r, _)) in self.entries.iter().enumerate() {
                if self.entry_color[k] == color {
                    out[k] = y[r].eps;
                }
            }
        }
        Ok(out)
    }
}
