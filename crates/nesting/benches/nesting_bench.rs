//! Benchmarks for autoclave nesting.
//!
//! Measures the heuristic, the exact search and full two-level solves at
//! various scales.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use autoclave_nesting::{
    BottomLeftFill, BranchAndBound, Container, Level, LevelRequest, Nester, Piece,
    PlacementStrategy, SolverConfig,
};

fn pieces(n: usize) -> Vec<Piece> {
    (0..n)
        .map(|i| {
            let w = 150.0 + (i as f64 * 37.0) % 250.0;
            let h = 100.0 + (i as f64 * 53.0) % 150.0;
            Piece::new(format!("P{}", i), w, h).with_weight(5.0 + (i % 7) as f64)
        })
        .collect()
}

fn bench_bottom_left_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("bottom_left_fill");
    group.sample_size(10);

    let config = SolverConfig::default();
    let container = Container::new("AC", 1500.0, 2000.0);
    for &n in &[10, 30, 60] {
        let batch = pieces(n);
        group.bench_with_input(BenchmarkId::new("pieces", n), &batch, |b, batch| {
            let strategy = BottomLeftFill::new(&config);
            b.iter(|| {
                let request = LevelRequest::new(Level::Base, batch.iter().collect(), &container, &config);
                black_box(strategy.place(black_box(&request)))
            })
        });
    }
    group.finish();
}

fn bench_branch_and_bound(c: &mut Criterion) {
    let mut group = c.benchmark_group("branch_and_bound");
    group.sample_size(10);

    let config = SolverConfig::default();
    let container = Container::new("AC", 1000.0, 800.0);
    for &n in &[4, 8, 12] {
        let batch = pieces(n);
        group.bench_with_input(BenchmarkId::new("pieces", n), &batch, |b, batch| {
            let strategy = BranchAndBound::new(&config).with_budget(Duration::from_millis(500));
            b.iter(|| {
                let request = LevelRequest::new(Level::Base, batch.iter().collect(), &container, &config);
                black_box(strategy.place(black_box(&request)))
            })
        });
    }
    group.finish();
}

fn bench_two_level_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("two_level_solve");
    group.sample_size(10);

    let container = Container::new("AC-2L", 1500.0, 1200.0)
        .with_two_levels(250.0, 300.0)
        .with_min_stand_clearance(40.0);
    let nester = Nester::new(SolverConfig::heuristic_only());
    for &n in &[20, 40] {
        let batch = pieces(n);
        group.bench_with_input(BenchmarkId::new("pieces", n), &batch, |b, batch| {
            b.iter(|| black_box(nester.solve(black_box(batch), black_box(&container))))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_bottom_left_fill,
    bench_branch_and_bound,
    bench_two_level_solve
);
criterion_main!(benches);
