//! Age/time smoothing prior over a rectangular grid.
//!
//! Grid values are stored row-major by age: `v[i * n_time + j]` is the value
//! at `age[i]`, `time[j]`. The prior contributes, in this order,
//!
//! 1. a value residual for every cell,
//! 2. an age-difference residual `v[i+1, j] - v[i, j]` for every `i < n_age - 1`,
//! 3. a time-difference residual `v[i, j+1] - v[i, j]` for every `j < n_time - 1`,
//!
//! with residual indices assigned consecutively from a caller-supplied base.

use super::bundle::ResidualBundle;
use super::residual::{Prior, Residual, ResidualMode};
use crate::types::{CoreError, Scalar};

/// Smoothing prior on an `n_age x n_time` grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPrior {
    age: Vec<f64>,
    time: Vec<f64>,
    value: Vec<Prior>,
    dage: Vec<Prior>,
    dtime: Vec<Prior>,
}

fn check_increasing(name: &str, grid: &[f64]) -> Result<(), CoreError> {
    if grid.is_empty() {
        return Err(CoreError::InvalidInput(format!("{} grid is empty", name)));
    }
    if grid.iter().any(|x| !x.is_finite()) {
        return Err(CoreError::InvalidInput(format!("{} grid has non-finite entries", name)));
    }
    if let Some(k) = grid.windows(2).position(|w| w[1] <= w[0]) {
        return Err(CoreError::InvalidInput(format!(
            "{} grid not strictly increasing at index {}",
            name,
            k + 1
        )));
    }
    Ok(())
}

impl GridPrior {
    /// Create a grid prior with per-cell and per-edge priors.
    ///
    /// # Errors
    /// - `CoreError::InvalidInput` if either grid is empty or not strictly increasing
    /// - `CoreError::DimensionMismatch` if a prior table has the wrong length:
    ///   `value` needs `n_age * n_time`, `dage` needs `(n_age - 1) * n_time`
    ///   and `dtime` needs `n_age * (n_time - 1)` entries
    pub fn new(
        age: Vec<f64>,
        time: Vec<f64>,
        value: Vec<Prior>,
        dage: Vec<Prior>,
        dtime: Vec<Prior>,
    ) -> Result<Self, CoreError> {
        check_increasing("age", &age)?;
        check_increasing("time", &time)?;
        let (n_age, n_time) = (age.len(), time.len());
        let expect = [
            ("grid value priors", n_age * n_time, value.len()),
            ("grid age-difference priors", (n_age - 1) * n_time, dage.len()),
            ("grid time-difference priors", n_age * (n_time - 1), dtime.len()),
        ];
        for (context, expected, got) in expect {
            if expected != got {
                return Err(CoreError::DimensionMismatch {
                    context,
                    expected,
                    got,
                });
            }
        }
        Ok(Self {
            age,
            time,
            value,
            dage,
            dtime,
        })
    }

    /// Same value, age-difference and time-difference prior at every cell.
    pub fn uniform_smoothing(
        age: Vec<f64>,
        time: Vec<f64>,
        value: Prior,
        dage: Prior,
        dtime: Prior,
    ) -> Result<Self, CoreError> {
        let (n_age, n_time) = (age.len(), time.len());
        let n_dage = n_age.saturating_sub(1) * n_time;
        let n_dtime = n_age * n_time.saturating_sub(1);
        Self::new(
            age,
            time,
            vec![value; n_age * n_time],
            vec![dage; n_dage],
            vec![dtime; n_dtime],
        )
    }

    /// Number of age points.
    pub fn n_age(&self) -> usize {
        self.age.len()
    }

    /// Number of time points.
    pub fn n_time(&self) -> usize {
        self.time.len()
    }

    /// Number of grid values.
    pub fn n_values(&self) -> usize {
        self.age.len() * self.time.len()
    }

    /// Number of residuals produced by [`GridPrior::residuals`].
    pub fn n_residuals(&self) -> usize {
        self.value.len() + self.dage.len() + self.dtime.len()
    }

    /// Age grid.
    pub fn age(&self) -> &[f64] {
        &self.age
    }

    /// Time grid.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// All residuals at grid values `v`, indexed from `first_index`.
    pub fn residuals<S: Scalar>(
        &self,
        v: &[S],
        first_index: usize,
    ) -> Result<Vec<Residual<S>>, CoreError> {
        let n_time = self.n_time();
        if v.len() != self.n_values() {
            return Err(CoreError::DimensionMismatch {
                context: "grid prior values",
                expected: self.n_values(),
                got: v.len(),
            });
        }
        let zero = S::zero();
        let mut out = Vec::with_capacity(self.n_residuals());
        let mut index = first_index;

        for (cell, prior) in self.value.iter().enumerate() {
            out.push(prior.residual(zero, v[cell], ResidualMode::Value, index));
            index += 1;
        }
        for (edge, prior) in self.dage.iter().enumerate() {
            // edge enumerates (i, j) with i < n_age - 1, row-major
            out.push(prior.residual(v[edge + n_time], v[edge], ResidualMode::Difference, index));
            index += 1;
        }
        for (edge, prior) in self.dtime.iter().enumerate() {
            let (i, j) = (edge / (n_time - 1), edge % (n_time - 1));
            let cell = i * n_time + j;
            out.push(prior.residual(v[cell + 1], v[cell], ResidualMode::Difference, index));
            index += 1;
        }
        Ok(out)
    }

    /// Push every residual at `v` into `bundle`.
    pub fn add_to<S: Scalar>(&self, v: &[S], bundle: &mut ResidualBundle<S>) -> Result<(), CoreError> {
        bundle.extend(self.residuals(v, 0)?);
        Ok(())
    }
}
