use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use localvol::prelude::*;

/// Three-expiry skewed grid, volatility falling with strike.
fn skew_surface() -> GridVolatilitySurface {
    GridVolatilitySurface::new(
        &[0.25, 0.5, 1.0],
        &[80.0, 140.0, 200.0],
        &[
            vec![0.21, 0.12, 0.06],
            vec![0.19, 0.10, 0.06],
            vec![0.20, 0.10, 0.06],
        ],
        InterpolatorKind::Linear,
        InterpolatorKind::Linear,
        Extrapolation::Flat,
    )
    .expect("benchmark grid should be valid")
}

fn bench_implied_tree(c: &mut Criterion) {
    let surface = skew_surface();
    let flat = FlatRateCurve::new(0.0).expect("flat curve");
    let mut group = c.benchmark_group("implied_tree");
    for steps in [10usize, 20, 40] {
        let calc = ImpliedTrinomialTreeLocalVolatilityCalculator::new(
            ImpliedTreeConfig::default()
                .with_step_count(steps)
                .and_then(|c| c.with_max_time(1.0))
                .expect("benchmark config should be valid"),
        )
        .expect("calculator");
        group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, _| {
            b.iter(|| {
                calc.calibrate_lattice(black_box(&surface), black_box(100.0), &flat, &flat)
                    .expect("calibration should succeed")
            })
        });
    }
    group.finish();
}

fn bench_dupire(c: &mut Criterion) {
    let surface = skew_surface();
    let r = FlatRateCurve::new(0.02).expect("flat curve");
    let q = FlatRateCurve::new(0.0).expect("flat curve");
    let local = DupireLocalVolatilityCalculator::default()
        .local_volatility(&surface, 100.0, &r, &q)
        .expect("dupire surface");

    c.bench_function("dupire_point", |b| {
        b.iter(|| local.evaluate(black_box(0.6), black_box(110.0)))
    });

    let times: Vec<f64> = (1..=20).map(|i| i as f64 * 0.05).collect();
    let strikes: Vec<f64> = (0..41).map(|i| 70.0 + i as f64 * 2.5).collect();
    c.bench_function("dupire_materialize_20x41", |b| {
        b.iter(|| local.materialize(black_box(&times), black_box(&strikes)))
    });
}

criterion_group!(benches, bench_implied_tree, bench_dupire);
criterion_main!(benches);
