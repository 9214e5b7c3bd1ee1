//! Integration tests for the Laplace model on grid-structured
//! rate models.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use mixed_ad::JointDensity;
use mixed_core::density::{residual_density, DensityKind, DensityTerms, GridPrior, Prior, ResidualBundle, ResidualMode};
use mixed_core::types::Scalar;
use mixed_optimiser::adapter::{IpoptFixed, NlpProblem, NlpSolution, SolverStatus};
use mixed_optimiser::config::{AdapterConfig, ProfilerConfig};
use mixed_optimiser::laplace::LaplaceModel;
use mixed_optimiser::model::{FixedPrior, MixedModel};
use proptest::prelude::*;

// ============================================================================
// Models
// ============================================================================

/// Measurements `y_k ~ N(v_k + u_k, data_std)` with `u_k ~ N(0, random_std)`.
#[derive(Debug)]
struct CellMeasurements {
    y: Vec<f64>,
    data_std: f64,
    random_std: f64,
}

impl JointDensity for CellMeasurements {
    fn n_fixed(&self) -> usize {
        self.y.len()
    }

    fn n_random(&self) -> usize {
        self.y.len()
    }

    fn eval<S: Scalar>(&self, fixed: &[S], random: &[S]) -> DensityTerms<S> {
        let zero = S::zero();
        let n = self.y.len();
        let mut bundle = ResidualBundle::new();
        for k in 0..n {
            bundle.push(&residual_density(
                zero,
                S::from_f64(self.y[k]),
                fixed[k] + random[k],
                S::from_f64(self.data_std),
                DensityKind::Gaussian,
                zero,
                k,
                ResidualMode::Value,
            ));
            bundle.push(&residual_density(
                zero,
                random[k],
                zero,
                S::from_f64(self.random_std),
                DensityKind::Gaussian,
                zero,
                n + k,
                ResidualMode::Value,
            ));
        }
        bundle.into_terms()
    }
}

/// Counts `y_k ~ Poisson(exp(v_k + u_k))` with `u_k ~ N(0, random_std)`.
#[derive(Debug)]
struct CellCounts {
    y: Vec<f64>,
    random_std: f64,
}

impl JointDensity for CellCounts {
    fn n_fixed(&self) -> usize {
        self.y.len()
    }

    fn n_random(&self) -> usize {
        self.y.len()
    }

    fn eval<S: Scalar>(&self, fixed: &[S], random: &[S]) -> DensityTerms<S> {
        let precision = S::from_f64(1.0 / (self.random_std * self.random_std));
        let mut f = S::zero();
        for (k, &y) in self.y.iter().enumerate() {
            let eta = fixed[k] + random[k];
            f = f + eta.exp() - S::from_f64(y) * eta + precision * random[k] * random[k] / S::from_f64(2.0);
        }
        DensityTerms::smooth_only(f)
    }
}

/// Smoothing prior on the fixed effects laid out as a grid.
#[derive(Debug)]
struct Smoothing {
    grid: GridPrior,
}

impl FixedPrior for Smoothing {
    fn n_fixed(&self) -> usize {
        self.grid.n_values()
    }

    fn eval<S: Scalar>(&self, fixed: &[S]) -> DensityTerms<S> {
        let mut bundle = ResidualBundle::new();
        self.grid
            .add_to(fixed, &mut bundle)
            .expect("grid values sized by n_fixed");
        bundle.into_terms()
    }
}

/// 2 x 2 grid: gaussian values, laplace age differences, gaussian time
/// differences.
fn smoothing() -> Smoothing {
    let grid = GridPrior::uniform_smoothing(
        vec![0.0, 50.0],
        vec![2000.0, 2010.0],
        Prior::gaussian(0.0, 2.0).unwrap(),
        Prior::laplace(0.0, 1.0).unwrap(),
        Prior::gaussian(0.0, 1.0).unwrap(),
    )
    .unwrap();
    Smoothing { grid }
}

fn measurements() -> CellMeasurements {
    CellMeasurements {
        y: vec![0.3, -0.2, 1.1, 0.8],
        data_std: 0.5,
        random_std: 0.3,
    }
}

fn counts() -> CellCounts {
    CellCounts {
        y: vec![3.0, 0.0, 7.0, 2.0],
        random_std: 0.8,
    }
}

fn profiled_objective<J: JointDensity>(model: &mut LaplaceModel<J, Smoothing>, theta: &[f64]) -> f64 {
    let u = model.optimize_random(theta, &[0.0; 4]).unwrap();
    model.laplace_eval(theta, theta, &u).unwrap()
}

// ============================================================================
// Prior
// ============================================================================

#[test]
fn test_grid_prior_terms() {
    let mut model = LaplaceModel::new(measurements(), smoothing()).unwrap();
    let theta = [0.1, 0.4, -0.3, 0.9];
    let terms = model.prior_eval(&theta).unwrap();
    // smooth + one abs term per age edge
    assert_eq!(terms.len(), 1 + 2);
    let sqrt2 = 2.0_f64.sqrt();
    assert_relative_eq!(terms[1], sqrt2 * (theta[2] - theta[0]), epsilon = 1e-14);
    assert_relative_eq!(terms[2], sqrt2 * (theta[3] - theta[1]), epsilon = 1e-14);

    let jac = model.prior_jac(&theta).unwrap();
    let dense = jac.to_dense(3, 4, false);
    assert_relative_eq!(dense[4], -sqrt2, epsilon = 1e-14);
    assert_relative_eq!(dense[4 + 2], sqrt2, epsilon = 1e-14);
    assert_eq!(dense[4 + 1], 0.0);
}

// ============================================================================
// Laplace Objective
// ============================================================================

#[test]
fn test_gaussian_profiled_hessian_closed_form() {
    let mut model = LaplaceModel::new(measurements(), smoothing()).unwrap();
    let theta = [0.0, 0.5, 1.0, 0.2];
    let u = model.optimize_random(&theta, &[0.0; 4]).unwrap();
    let h = model.laplace_hes_fix(&theta, &u).unwrap();
    let dense = h.to_dense(4, 4, true);
    let expected = 1.0 / (0.5_f64.powi(2) + 0.3_f64.powi(2));
    for i in 0..4 {
        for j in 0..4 {
            let e = if i == j { expected } else { 0.0 };
            assert_abs_diff_eq!(dense[i * 4 + j], e, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_gradient_with_varying_curvature() {
    let mut model = LaplaceModel::new(counts(), smoothing())
        .unwrap()
        .with_config(ProfilerConfig::high_precision());
    let theta = [1.0, -0.5, 1.8, 0.6];
    let u = model.optimize_random(&theta, &[0.0; 4]).unwrap();
    let grad = model.laplace_grad_fix(&theta, &u).unwrap();

    let step = 1e-5;
    for k in 0..4 {
        let mut up = theta;
        let mut down = theta;
        up[k] += step;
        down[k] -= step;
        let fd = (profiled_objective(&mut model, &up) - profiled_objective(&mut model, &down)) / (2.0 * step);
        assert_relative_eq!(grad[k], fd, max_relative = 1e-6, epsilon = 1e-8);
    }
}

#[test]
fn test_hessian_matches_gradient_differences_for_gaussian_model() {
    let mut model = LaplaceModel::new(measurements(), smoothing()).unwrap();
    let theta = [0.2, -0.1, 0.7, 0.4];
    let u = model.optimize_random(&theta, &[0.0; 4]).unwrap();
    let h = model.laplace_hes_fix(&theta, &u).unwrap().to_dense(4, 4, true);

    let step = 1e-5;
    for k in 0..4 {
        let mut up = theta;
        let mut down = theta;
        up[k] += step;
        down[k] -= step;
        let u_up = model.optimize_random(&up, &u).unwrap();
        let u_down = model.optimize_random(&down, &u).unwrap();
        let g_up = model.laplace_grad_fix(&up, &u_up).unwrap();
        let g_down = model.laplace_grad_fix(&down, &u_down).unwrap();
        for i in 0..4 {
            let fd = (g_up[i] - g_down[i]) / (2.0 * step);
            assert_abs_diff_eq!(h[i * 4 + k], fd, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_hessian_matches_gradient_differences_with_varying_curvature() {
    let mut model = LaplaceModel::new(counts(), smoothing())
        .unwrap()
        .with_config(ProfilerConfig::high_precision());
    let theta = [1.0, -0.5, 1.8, 0.6];
    let u = model.optimize_random(&theta, &[0.0; 4]).unwrap();
    let h = model.laplace_hes_fix(&theta, &u).unwrap().to_dense(4, 4, true);

    let step = 1e-5;
    for k in 0..4 {
        let mut up = theta;
        let mut down = theta;
        up[k] += step;
        down[k] -= step;
        let u_up = model.optimize_random(&up, &u).unwrap();
        let u_down = model.optimize_random(&down, &u).unwrap();
        let g_up = model.laplace_grad_fix(&up, &u_up).unwrap();
        let g_down = model.laplace_grad_fix(&down, &u_down).unwrap();
        for i in 0..4 {
            let fd = (g_up[i] - g_down[i]) / (2.0 * step);
            assert_relative_eq!(h[i * 4 + k], fd, max_relative = 1e-5, epsilon = 1e-6);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_gaussian_random_effects_shrink_towards_data(
        theta in prop::collection::vec(-2.0..2.0_f64, 4),
    ) {
        let data = measurements();
        let (var_y, var_u) = (data.data_std.powi(2), data.random_std.powi(2));
        let y = data.y.clone();
        let mut model = LaplaceModel::new(data, smoothing()).unwrap();
        let u = model.optimize_random(&theta, &[0.0; 4]).unwrap();
        for k in 0..4 {
            let expected = var_u * (y[k] - theta[k]) / (var_y + var_u);
            prop_assert!((u[k] - expected).abs() < 1e-9, "u[{}] = {}, expected {}", k, u[k], expected);
        }
    }
}

// ============================================================================
// Adapter on a Grid Model
// ============================================================================

#[test]
fn test_adapter_callbacks_at_starting_point() {
    let model = LaplaceModel::new(counts(), smoothing()).unwrap();
    let lower = [-10.0; 4];
    let upper = [10.0; 4];
    let mut nlp = IpoptFixed::new(model, &lower, &[0.5; 4], &upper, &[0.0; 4], AdapterConfig::default()).unwrap();

    let sizes = nlp.get_sizes();
    assert_eq!(sizes.n, 4 + 2);
    assert_eq!(sizes.m, 4);
    // dense lower triangle of the Laplace Hessian covers the prior Hessian
    assert_eq!(sizes.nnz_h_lag, 10);

    let mut x = vec![0.0; sizes.n];
    assert!(nlp.get_starting_point(&mut x));
    assert_eq!(&x[4..], &[0.0, 0.0]);

    let mut f = 0.0;
    let mut grad = vec![0.0; sizes.n];
    let mut g = vec![0.0; sizes.m];
    let mut jac = vec![0.0; sizes.nnz_jac_g];
    let mut hes = vec![0.0; sizes.nnz_h_lag];
    let lambda = vec![0.0; sizes.m];
    assert!(nlp.eval_f(&x, true, &mut f));
    assert!(nlp.eval_grad_f(&x, false, &mut grad));
    assert!(nlp.eval_g(&x, false, &mut g));
    assert!(nlp.eval_jac_g(&x, false, &mut jac));
    assert!(nlp.eval_h(&x, false, 1.0, &lambda, true, &mut hes));
    assert!(f.is_finite());
    assert_eq!(g, vec![0.0; 4]);
    assert_relative_eq!(nlp.best().objective(), f, epsilon = 1e-12);

    // starting point is not optimal
    let solution = NlpSolution {
        status: SolverStatus::MaxIterExceeded,
        x: x.clone(),
        z_l: vec![0.0; sizes.n],
        z_u: vec![0.0; sizes.n],
        g,
        lambda,
        obj_value: f,
    };
    nlp.finalize_solution(&solution);
    assert_eq!(nlp.finalize_ok(), Some(false));
    assert!(nlp.best().is_set());
}
