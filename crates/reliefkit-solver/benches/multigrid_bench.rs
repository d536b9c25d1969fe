use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reliefkit_core::{HeightField, PlanarMask};
use reliefkit_solver::{atimes, BiCgSmoother, MultigridConfig, MultigridSolver};

fn paraboloid_rhs(size: usize) -> HeightField {
    let c = size as f64 / 2.0;
    let u = HeightField::from_fn(size, size, |x, y| {
        let dx = x as f64 - c;
        let dy = y as f64 - c;
        -(dx * dx + dy * dy) / (size * size) as f64
    });
    let mut f = HeightField::zeros(size, size);
    atimes(&u, &mut f);
    f
}

fn bench_multigrid(c: &mut Criterion) {
    let mut group = c.benchmark_group("multigrid_solve");
    for size in [64usize, 128, 256] {
        let rhs = paraboloid_rhs(size);
        let planar = PlanarMask::filled(size, size, false);
        let solver = MultigridSolver::new(MultigridConfig::default());
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                solver
                    .solve(black_box(rhs.clone()), planar.clone())
                    .map(|o| o.report.final_residual)
            })
        });
    }
    group.finish();
}

fn bench_smoother(c: &mut Criterion) {
    let rhs = paraboloid_rhs(128);
    let smoother = BiCgSmoother::default();
    c.bench_function("bicg_smooth_128", |b| {
        b.iter(|| {
            let mut u = HeightField::zeros(128, 128);
            smoother.smooth(&mut u, black_box(&rhs))
        })
    });
}

criterion_group!(benches, bench_multigrid, bench_smoother);
criterion_main!(benches);
