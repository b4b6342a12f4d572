//! Criterion benchmarks for the water stepping loop.
//!
//! Benchmarks:
//!   - a single explicit flow step over the full grid
//!   - a whole display cycle (budget loop + continuous effects)
//!   - stable step-size selection (a max scan over the depth field)
//!
//! Run with: cargo bench -p simulation --bench step_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use simulation::config::{CELL_SIZE, GRID_HEIGHT, GRID_WIDTH};
use simulation::contributions::{Contribution, ContributionRegistry};
use simulation::engine::advance_cycle;
use simulation::engine::schemes::{engineering_step, stable_step_size, traditional_step};
use simulation::grid::ScalarGrid;
use simulation::params::SimParams;
use simulation::property::PropertyGrid;

fn bumpy_terrain() -> (ScalarGrid, ScalarGrid) {
    let mut bathymetry = ScalarGrid::new(GRID_WIDTH, GRID_HEIGHT);
    let mut water = ScalarGrid::new(GRID_WIDTH, GRID_HEIGHT);
    for y in 0..GRID_HEIGHT {
        for x in 0..GRID_WIDTH {
            bathymetry.set(x, y, ((x * 13 + y * 7) % 23) as f32 * 0.4);
            water.set(x, y, ((x + y * 3) % 5) as f32 * 0.3);
        }
    }
    (bathymetry, water)
}

fn bench_flow_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("flow_step");
    group.sample_size(50);

    let (bathymetry, water) = bumpy_terrain();
    let property = PropertyGrid::new(GRID_WIDTH, GRID_HEIGHT);
    let mut scratch = Vec::new();

    group.bench_function("traditional", |b| {
        let mut water = water.clone();
        b.iter(|| {
            traditional_step(
                black_box(0.005),
                1.0,
                CELL_SIZE,
                &bathymetry,
                &mut water,
                &mut scratch,
            );
        });
    });
    group.bench_function("engineering", |b| {
        let mut water = water.clone();
        b.iter(|| {
            engineering_step(
                black_box(0.005),
                1.0,
                CELL_SIZE,
                &bathymetry,
                &property,
                &mut water,
                &mut scratch,
            );
        });
    });
    group.finish();
}

fn bench_full_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("display_cycle");
    group.sample_size(30);

    let (bathymetry, water) = bumpy_terrain();
    let params = SimParams::default();
    let property = PropertyGrid::new(GRID_WIDTH, GRID_HEIGHT);
    let mut registry = ContributionRegistry::default();
    registry.add(Contribution::RainDisk {
        center: (GRID_WIDTH as f32 / 2.0, GRID_HEIGHT as f32 / 2.0),
        radius: 20.0,
        strength: None,
    });

    group.bench_function("one_cycle_with_rain", |b| {
        let mut water = water.clone();
        let mut snow = ScalarGrid::new(GRID_WIDTH, GRID_HEIGHT);
        let mut scratch = Vec::new();
        b.iter(|| {
            advance_cycle(
                black_box(1.0 / 30.0),
                &params,
                &registry,
                &property,
                &bathymetry,
                &mut water,
                &mut snow,
                &mut scratch,
            )
        });
    });
    group.finish();
}

fn bench_stable_step_size(c: &mut Criterion) {
    let (_, water) = bumpy_terrain();
    c.bench_function("stable_step_size", |b| {
        b.iter(|| black_box(stable_step_size(black_box(&water), CELL_SIZE)));
    });
}

criterion_group!(
    benches,
    bench_flow_step,
    bench_full_cycle,
    bench_stable_step_size
);
criterion_main!(benches);
