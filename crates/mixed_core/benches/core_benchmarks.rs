//! Benchmarks for mixed_core.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mixed_core::density::{GridPrior, Prior, ResidualBundle};
use mixed_core::math::Cholesky;
use mixed_core::sparsity::{merge_sparse, SparsityPattern};

fn banded_pattern(n: usize, band: usize) -> SparsityPattern {
    SparsityPattern::from_pairs(
        (0..n).flat_map(|i| (i.saturating_sub(band)..=i).map(move |j| (i, j))),
    )
    .unwrap()
}

fn benchmark_merge_sparse(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_sparse");

    for n in [10, 100, 1000] {
        let one = banded_pattern(n, 2);
        let two = banded_pattern(n, 4);
        group.bench_with_input(BenchmarkId::from_parameter(n), &(one, two), |b, (one, two)| {
            b.iter(|| merge_sparse(black_box(one), black_box(two)))
        });
    }

    group.finish();
}

fn benchmark_grid_prior(c: &mut Criterion) {
    let grid = GridPrior::uniform_smoothing(
        (0..20).map(|i| i as f64 * 5.0).collect(),
        (0..10).map(|j| 1990.0 + j as f64 * 3.0).collect(),
        Prior::gaussian(0.0, 1.0).unwrap(),
        Prior::laplace(0.0, 0.1).unwrap(),
        Prior::gaussian(0.0, 0.1).unwrap(),
    )
    .unwrap();
    let v: Vec<f64> = (0..grid.n_values()).map(|k| (k as f64 * 0.1).sin()).collect();

    c.bench_function("grid_prior_20x10", |b| {
        b.iter(|| {
            let mut bundle = ResidualBundle::new();
            grid.add_to(black_box(&v), &mut bundle).unwrap();
            bundle.log_density()
        })
    });
}

fn benchmark_cholesky(c: &mut Criterion) {
    let n = 50;
    let mut a = vec![0.0; n * n];
    for i in 0..n {
        a[i * n + i] = 4.0;
        if i > 0 {
            a[i * n + i - 1] = -1.0;
            a[(i - 1) * n + i] = -1.0;
        }
    }
    let b_vec = vec![1.0; n];

    c.bench_function("cholesky_tridiagonal_50", |b| {
        b.iter(|| {
            let chol = Cholesky::factor(black_box(&a), n).unwrap();
            chol.solve(&b_vec).unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_merge_sparse,
    benchmark_grid_prior,
    benchmark_cholesky
);
criterion_main!(benches);
