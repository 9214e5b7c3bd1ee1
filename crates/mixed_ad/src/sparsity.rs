//! Jacobian and Hessian sparsity detection on a recording.
//!
//! Sparsity is found structurally, without evaluating any derivative:
//!
//! 1. a forward pass propagates, for every node, the set of seeded
//!    independent variables it depends on;
//! 2. a reverse pass, seeded at the weighted outputs, propagates for every
//!    node the set of seeded variables that appear with it in a nonzero
//!    second-order term.
//!
//! After the reverse pass, the set attached to independent variable `j`
//! is the column set of row `j` of the Hessian restricted to seeded columns.

use crate::tape::{Op, Recording};
use std::collections::BTreeSet;

/// Per-node dependency sets.
pub type IndexSets = Vec<BTreeSet<usize>>;

impl Recording {
    /// Forward Jacobian sparsity of every node, seeded on `seeds`.
    ///
    /// Entry `i` of the result is the set of seeded independents that node
    /// `i` may depend on.
    pub fn node_dependencies(&self, seeds: &[usize]) -> IndexSets {
        let mut sets: IndexSets = vec![BTreeSet::new(); self.nodes.len()];
        for &s in seeds {
            if s < self.n_independent {
                sets[s].insert(s);
            }
        }
        for i in self.n_independent..self.nodes.len() {
            let node = self.nodes[i];
            let mut set = BTreeSet::new();
            for &arg in &node.args[..node.op.arity()] {
                set.extend(sets[arg].iter().copied());
            }
            if matches!(node.op, Op::Powi(0) | Op::Sign) {
                set.clear();
            }
            sets[i] = set;
        }
        sets
    }

    /// Jacobian sparsity of the dependent variables, seeded on `seeds`.
    pub fn jac_sparsity(&self, seeds: &[usize]) -> IndexSets {
        let sets = self.node_dependencies(seeds);
        self.outputs.iter().map(|&o| sets[o].clone()).collect()
    }

    /// Hessian sparsity of `sum_k w_k y_k` over seeded columns.
    ///
    /// `weighted` flags the outputs whose weight may be nonzero. Returns one
    /// set per independent variable: the seeded columns with a possibly
    /// nonzero second derivative in that row.
    pub fn hes_sparsity(&self, seeds: &[usize], weighted: &[bool]) -> IndexSets {
        debug_assert_eq!(weighted.len(), self.outputs.len());
        let jac = self.node_dependencies(seeds);
        let n = self.nodes.len();
        let mut reaches = vec![false; n];
        let mut hes: IndexSets = vec![BTreeSet::new(); n];
        for (&o, &w) in self.outputs.iter().zip(weighted) {
            if w {
                reaches[o] = true;
            }
        }

        for i in (self.n_independent..n).rev() {
            if !reaches[i] {
                continue;
            }
            let node = self.nodes[i];
            let [a, b] = node.args;
            let here = std::mem::take(&mut hes[i]);
            match node.op {
                Op::Independent | Op::Constant(_) | Op::Powi(0) | Op::Sign => {}
                Op::Add | Op::Sub => {
                    for arg in [a, b] {
                        reaches[arg] = true;
                        hes[arg].extend(here.iter().copied());
                    }
                }
                Op::Neg | Op::Abs | Op::Powi(1) => {
                    reaches[a] = true;
                    hes[a].extend(here.iter().copied());
                }
                Op::Mul => {
                    reaches[a] = true;
                    reaches[b] = true;
                    let (ja, jb) = (jac[a].clone(), jac[b].clone());
                    hes[a].extend(here.iter().copied().chain(jb));
                    hes[b].extend(here.iter().copied().chain(ja));
                }
                Op::Div => {
                    reaches[a] = true;
                    reaches[b] = true;
                    let (ja, jb) = (jac[a].clone(), jac[b].clone());
                    hes[a].extend(here.iter().copied().chain(jb.iter().copied()));
                    hes[b].extend(here.iter().copied().chain(ja).chain(jb));
                }
                Op::Exp | Op::Ln | Op::Sqrt | Op::Powi(_) => {
                    reaches[a] = true;
                    let ja = jac[a].clone();
                    hes[a].extend(here.iter().copied().chain(ja));
                }
            }
            hes[i] = here;
        }

        hes.truncate(self.n_independent);
        hes
    }
}
