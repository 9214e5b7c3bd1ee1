//! # Operation Tape
//!
//! A [`Recording`] is a flat list of [`Node`]s produced by evaluating a
//! [`Scalar`]-generic function with [`TapeVar`] arguments. Once recorded it
//! can be replayed forward and swept in reverse with any other [`Scalar`]:
//! plain `f64` for values and gradients, num-dual numbers for
//! forward-over-reverse second (and third) derivatives, or [`TapeVar`] again
//! to record the derivative computation itself as a new recording.
//!
//! ## Layout
//!
//! The first `n_independent` nodes are the independent variables in
//! declaration order. Every other node refers only to earlier nodes, so
//! node order is a valid evaluation order.
//!
//! ## Example
//!
//! ```rust
//! use mixed_ad::Recording;
//! use mixed_core::types::Scalar;
//!
//! // f(x, y) = x * exp(y)
//! let rec = Recording::record(&[2.0, 0.0], |v| vec![v[0] * v[1].exp()]);
//!
//! let value: Vec<f64> = rec.eval(&[3.0, 0.0]).unwrap();
//! assert_eq!(value, vec![3.0]);
//!
//! let grad: Vec<f64> = rec.gradient(&[3.0, 0.0], &[1.0]).unwrap();
//! assert_eq!(grad, vec![1.0, 3.0]);
//! ```

use crate::error::AdError;
use mixed_core::types::Scalar;
use num_traits::{One, Zero};
use std::cell::RefCell;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

// =============================================================================
// Op / Node
// =============================================================================

/// Operation performed by a tape node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    /// Independent variable
    Independent,
    /// Constant folded into the recording
    Constant(f64),
    /// a + b
    Add,
    /// a - b
    Sub,
    /// a * b
    Mul,
    /// a / b
    Div,
    /// -a
    Neg,
    /// exp(a)
    Exp,
    /// ln(a)
    Ln,
    /// sqrt(a)
    Sqrt,
    /// |a|
    Abs,
    /// sign(a), the derivative of |a|
    Sign,
    /// a^n
    Powi(i32),
}

impl Op {
    /// Number of node arguments read by this operation.
    pub fn arity(self) -> usize {
        match self {
            Op::Independent | Op::Constant(_) => 0,
            Op::Add | Op::Sub | Op::Mul | Op::Div => 2,
            Op::Neg | Op::Exp | Op::Ln | Op::Sqrt | Op::Abs | Op::Sign | Op::Powi(_) => 1,
        }
    }
}

/// One recorded operation. Unused argument slots are zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Operation
    pub op: Op,
    /// Indices of argument nodes
    pub args: [usize; 2],
}

// =============================================================================
// Tape / TapeVar
// =============================================================================

#[derive(Default)]
pub(crate) struct Tape {
    nodes: RefCell<Vec<Node>>,
}

impl Tape {
    fn push(&self, op: Op, args: [usize; 2]) -> usize {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(Node { op, args });
        nodes.len() - 1
    }

    fn independent(&self, value: f64) -> TapeVar<'_> {
        debug_assert!(
            self.nodes.borrow().iter().all(|n| n.op == Op::Independent),
            "independent variables must precede all operations"
        );
        TapeVar {
            tape: Some(self),
            index: self.push(Op::Independent, [0, 0]),
            value,
        }
    }

    fn into_nodes(self) -> Vec<Node> {
        self.nodes.into_inner()
    }
}

/// Scalar that records every operation applied to it.
///
/// A `TapeVar` without a tape is a constant; operations between constants are
/// evaluated immediately and not recorded.
#[derive(Clone, Copy)]
pub struct TapeVar<'t> {
    tape: Option<&'t Tape>,
    index: usize,
    value: f64,
}

impl fmt::Debug for TapeVar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tape {
            Some(_) => write!(f, "TapeVar(#{} = {})", self.index, self.value),
            None => write!(f, "TapeVar(const {})", self.value),
        }
    }
}

impl<'t> TapeVar<'t> {
    /// Constant, not attached to any tape.
    pub fn constant(value: f64) -> Self {
        TapeVar {
            tape: None,
            index: 0,
            value,
        }
    }

    /// True if this value does not depend on any independent variable.
    pub fn is_constant(&self) -> bool {
        self.tape.is_none()
    }

    fn index_on(&self, tape: &'t Tape) -> usize {
        match self.tape {
            Some(own) => {
                debug_assert!(std::ptr::eq(own, tape), "mixing variables of two tapes");
                self.index
            }
            None => tape.push(Op::Constant(self.value), [0, 0]),
        }
    }

    fn unary(self, op: Op, value: f64) -> Self {
        match self.tape {
            None => Self::constant(value),
            Some(tape) => TapeVar {
                tape: Some(tape),
                index: tape.push(op, [self.index, 0]),
                value,
            },
        }
    }

    fn binary(self, rhs: Self, op: Op, value: f64) -> Self {
        match self.tape.or(rhs.tape) {
            None => Self::constant(value),
            Some(tape) => {
                let a = self.index_on(tape);
                let b = rhs.index_on(tape);
                TapeVar {
                    tape: Some(tape),
                    index: tape.push(op, [a, b]),
                    value,
                }
            }
        }
    }
}

impl<'t> Add for TapeVar<'t> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.binary(rhs, Op::Add, self.value + rhs.value)
    }
}

impl<'t> Sub for TapeVar<'t> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.binary(rhs, Op::Sub, self.value - rhs.value)
    }
}

impl<'t> Mul for TapeVar<'t> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.binary(rhs, Op::Mul, self.value * rhs.value)
    }
}

impl<'t> Div for TapeVar<'t> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        self.binary(rhs, Op::Div, self.value / rhs.value)
    }
}

impl<'t> Neg for TapeVar<'t> {
    type Output = Self;
    fn neg(self) -> Self {
        self.unary(Op::Neg, -self.value)
    }
}

impl<'t> Zero for TapeVar<'t> {
    fn zero() -> Self {
        Self::constant(0.0)
    }

    fn is_zero(&self) -> bool {
        self.tape.is_none() && self.value == 0.0
    }
}

impl<'t> One for TapeVar<'t> {
    fn one() -> Self {
        Self::constant(1.0)
    }
}

impl<'t> Scalar for TapeVar<'t> {
    fn from_f64(value: f64) -> Self {
        Self::constant(value)
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn exp(self) -> Self {
        self.unary(Op::Exp, self.value.exp())
    }

    fn ln(self) -> Self {
        self.unary(Op::Ln, self.value.ln())
    }

    fn sqrt(self) -> Self {
        self.unary(Op::Sqrt, self.value.sqrt())
    }

    fn abs(self) -> Self {
        self.unary(Op::Abs, self.value.abs())
    }

    fn sign(self) -> Self {
        let value = if self.value < 0.0 { -1.0 } else { 1.0 };
        self.unary(Op::Sign, value)
    }

    fn powi(self, n: i32) -> Self {
        self.unary(Op::Powi(n), self.value.powi(n))
    }
}

// =============================================================================
// Recording
// =============================================================================

/// Immutable recording of a function `R^n -> R^m`.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_independent: usize,
    pub(crate) outputs: Vec<usize>,
}

impl Recording {
    /// Record `f` evaluated at `point`.
    ///
    /// `f` receives one tape variable per entry of `point` and returns the
    /// dependent variables. Constant outputs are recorded as constant nodes.
    pub fn record<F>(point: &[f64], f: F) -> Self
    where
        F: for<'t> FnOnce(&[TapeVar<'t>]) -> Vec<TapeVar<'t>>,
    {
        let tape = Tape::default();
        let outputs = {
            let vars: Vec<TapeVar<'_>> = point.iter().map(|&x| tape.independent(x)).collect();
            let ys = f(&vars);
            ys.iter().map(|y| y.index_on(&tape)).collect::<Vec<_>>()
        };
        Recording {
            nodes: tape.into_nodes(),
            n_independent: point.len(),
            outputs,
        }
    }

    /// Number of independent variables.
    pub fn n_independent(&self) -> usize {
        self.n_independent
    }

    /// Number of dependent variables.
    pub fn n_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the recording has no nodes at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recorded nodes in evaluation order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node index of each dependent variable.
    pub fn outputs(&self) -> &[usize] {
        &self.outputs
    }

    fn check_len(&self, what: &str, expected: usize, got: usize) -> Result<(), AdError> {
        if expected != got {
            return Err(AdError::size(what, expected, got));
        }
        Ok(())
    }

    /// Evaluate the dependent variables at `x`.
    pub fn eval<S: Scalar>(&self, x: &[S]) -> Result<Vec<S>, AdError> {
        self.check_len("recording arguments", self.n_independent, x.len())?;
        let values = self.forward(x);
        Ok(self.outputs.iter().map(|&o| values[o]).collect())
    }

    /// Gradient of `sum_k weights[k] * y_k` with respect to every independent.
    pub fn gradient<S: Scalar>(&self, x: &[S], weights: &[S]) -> Result<Vec<S>, AdError> {
        self.check_len("recording arguments", self.n_independent, x.len())?;
        self.check_len("recording weights", self.outputs.len(), weights.len())?;
        let values = self.forward(x);
        Ok(self.reverse(&values, weights))
    }

    /// Value of every node at `x`. `x` must have length `n_independent`.
    pub(crate) fn forward<S: Scalar>(&self, x: &[S]) -> Vec<S> {
        debug_assert_eq!(x.len(), self.n_independent);
        let mut v: Vec<S> = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            let [a, b] = node.args;
            let value = match node.op {
                Op::Independent => x[i],
                Op::Constant(c) => S::from_f64(c),
                Op::Add => v[a] + v[b],
                Op::Sub => v[a] - v[b],
                Op::Mul => v[a] * v[b],
                Op::Div => v[a] / v[b],
                Op::Neg => -v[a],
                Op::Exp => v[a].exp(),
                Op::Ln => v[a].ln(),
                Op::Sqrt => v[a].sqrt(),
                Op::Abs => v[a].abs(),
                Op::Sign => v[a].sign(),
                Op::Powi(n) => v[a].powi(n),
            };
            v.push(value);
        }
        v
    }

    /// Nodes on which at least one dependent variable depends.
    pub(crate) fn live_nodes(&self) -> Vec<bool> {
        let mut live = vec![false; self.nodes.len()];
        for &o in &self.outputs {
            live[o] = true;
        }
        for i in (0..self.nodes.len()).rev() {
            if !live[i] {
                continue;
            }
            let node = self.nodes[i];
            for &arg in &node.args[..node.op.arity()] {
                live[arg] = true;
            }
        }
        live
    }

    /// Reverse sweep: adjoints of the independents for output weights
    /// `weights`, given node values from [`Recording::forward`].
    pub(crate) fn reverse<S: Scalar>(&self, values: &[S], weights: &[S]) -> Vec<S> {
        debug_assert_eq!(values.len(), self.nodes.len());
        debug_assert_eq!(weights.len(), self.outputs.len());
        let live = self.live_nodes();
        let mut adj = vec![S::zero(); self.nodes.len()];
        for (&o, &w) in self.outputs.iter().zip(weights) {
            adj[o] = adj[o] + w;
        }

        for i in (self.n_independent..self.nodes.len()).rev() {
            if !live[i] {
                continue;
            }
            let w = adj[i];
            let [a, b] = self.nodes[i].args;
            match self.nodes[i].op {
                Op::Independent | Op::Constant(_) | Op::Sign => {}
                Op::Add => {
                    adj[a] = adj[a] + w;
                    adj[b] = adj[b] + w;
                }
                Op::Sub => {
                    adj[a] = adj[a] + w;
                    adj[b] = adj[b] - w;
                }
                Op::Mul => {
                    adj[a] = adj[a] + w * values[b];
                    adj[b] = adj[b] + w * values[a];
                }
                Op::Div => {
                    let wb = w / values[b];
                    adj[a] = adj[a] + wb;
                    adj[b] = adj[b] - wb * values[i];
                }
                Op::Neg => adj[a] = adj[a] - w,
                Op::Exp => adj[a] = adj[a] + w * values[i],
                Op::Ln => adj[a] = adj[a] + w / values[a],
                Op::Sqrt => adj[a] = adj[a] + w / (S::from_f64(2.0) * values[i]),
                // sign is a tape operation, so a recorded sweep stays a function
                // of the point
                Op::Abs => adj[a] = adj[a] + w * values[a].sign(),
                Op::Powi(0) => {}
                Op::Powi(1) => adj[a] = adj[a] + w,
                Op::Powi(n) => {
                    adj[a] = adj[a] + w * S::from_f64(f64::from(n)) * values[a].powi(n - 1)
                }
            }
        }

        adj.truncate(self.n_independent);
        adj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_dual::Dual64;

    fn rosenbrock<S: Scalar>(x: &[S]) -> S {
        let a = S::one() - x[0];
        let b = x[1] - x[0] * x[0];
        a * a + S::from_f64(100.0) * b * b
    }

    #[test]
    fn test_independents_come_first() {
        let rec = Recording::record(&[1.0, 2.0, 3.0], |v| vec![v[2] * v[0]]);
        assert_eq!(rec.n_independent(), 3);
        assert!(rec.nodes()[..3].iter().all(|n| n.op == Op::Independent));
        assert_eq!(rec.nodes()[3].op, Op::Mul);
        assert_eq!(rec.nodes()[3].args, [2, 0]);
    }

    #[test]
    fn test_constant_folding() {
        let rec = Recording::record(&[1.0], |v| {
            let c = TapeVar::constant(2.0) * TapeVar::constant(3.0);
            vec![v[0] + c]
        });
        // x, const 6, add
        assert_eq!(rec.len(), 3);
        assert_eq!(rec.nodes()[1].op, Op::Constant(6.0));
    }

    #[test]
    fn test_constant_output_is_recorded() {
        let rec = Recording::record(&[1.0], |_| vec![TapeVar::constant(4.0)]);
        assert_eq!(rec.eval(&[10.0]).unwrap(), vec![4.0]);
        assert_eq!(rec.gradient(&[10.0], &[1.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_replay_at_new_point() {
        let rec = Recording::record(&[0.0, 0.0], |v| vec![rosenbrock(v)]);
        let y: Vec<f64> = rec.eval(&[1.0, 1.0]).unwrap();
        assert_relative_eq!(y[0], 0.0);
        let y: Vec<f64> = rec.eval(&[-1.0, 2.0]).unwrap();
        assert_relative_eq!(y[0], rosenbrock(&[-1.0, 2.0]));
    }

    #[test]
    fn test_gradient_matches_dual() {
        let rec = Recording::record(&[0.3, -0.2], |v| vec![rosenbrock(v)]);
        let x = [-0.7, 1.3];
        let g: Vec<f64> = rec.gradient(&x, &[1.0]).unwrap();
        for k in 0..2 {
            let xd: Vec<Dual64> = (0..2)
                .map(|i| Dual64::new(x[i], if i == k { 1.0 } else { 0.0 }))
                .collect();
            assert_relative_eq!(g[k], rosenbrock(&xd).eps, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unary_derivatives() {
        // f = exp(x) + ln(x) + sqrt(x) + |-x| + x^3
        let rec = Recording::record(&[1.0], |v| {
            let x = v[0];
            vec![x.exp() + x.ln() + x.sqrt() + (-x).abs() + x.powi(3)]
        });
        let x: f64 = 2.0;
        let g: Vec<f64> = rec.gradient(&[x], &[1.0]).unwrap();
        let expected = x.exp() + 1.0 / x + 0.5 / x.sqrt() + 1.0 + 3.0 * x * x;
        assert_relative_eq!(g[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_weighted_outputs() {
        let rec = Recording::record(&[1.0, 1.0], |v| vec![v[0] * v[1], v[0] / v[1]]);
        let g: Vec<f64> = rec.gradient(&[2.0, 4.0], &[1.0, 2.0]).unwrap();
        // d/dx0 = x1 + 2 / x1, d/dx1 = x0 - 2 x0 / x1^2
        assert_relative_eq!(g[0], 4.5);
        assert_relative_eq!(g[1], 2.0 - 0.25);
    }

    #[test]
    fn test_size_errors() {
        let rec = Recording::record(&[1.0, 1.0], |v| vec![v[0] + v[1]]);
        assert!(matches!(rec.eval(&[1.0]), Err(AdError::ContractViolation(_))));
        assert!(rec.gradient(&[1.0, 2.0], &[1.0, 1.0]).is_err());
    }

    #[test]
    fn test_gradient_recorded_on_new_tape() {
        // Record the gradient of x^2 y, then differentiate it again.
        let f = Recording::record(&[1.0, 1.0], |v| vec![v[0] * v[0] * v[1]]);
        let grad = Recording::record(&[1.0, 1.0], |v| {
            f.gradient(v, &[TapeVar::one()]).unwrap()
        });
        assert_eq!(grad.n_outputs(), 2);
        let x = [3.0, 2.0];
        // gradient = (2 x y, x^2)
        assert_eq!(grad.eval(&x).unwrap(), vec![12.0, 9.0]);
        // d/dx of first component = 2 y
        let h: Vec<f64> = grad.gradient(&x, &[1.0, 0.0]).unwrap();
        assert_eq!(h, vec![4.0, 6.0]);
    }

    #[test]
    fn test_recorded_abs_adjoint_follows_the_point() {
        // d|x|/dx recorded at x = -2 and replayed on both sides of zero
        let f = Recording::record(&[-2.0], |v| vec![v[0].abs()]);
        let grad = Recording::record(&[-2.0], |v| f.gradient(v, &[TapeVar::one()]).unwrap());
        assert!(grad.nodes().iter().any(|n| n.op == Op::Sign));
        assert_eq!(grad.eval(&[0.7]).unwrap(), vec![1.0]);
        assert_eq!(grad.eval(&[-0.7]).unwrap(), vec![-1.0]);
        assert_eq!(grad.gradient(&[0.7], &[1.0]).unwrap(), vec![0.0]);
        // sign carries no second-order dependency
        assert!(grad.hes_sparsity(&[0], &[true])[0].is_empty());
    }
}
