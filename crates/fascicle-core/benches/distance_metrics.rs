//! Benchmarks for the pairwise distance hot path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fascicle_core::affinity::AffinityMatrix;
use fascicle_core::config::AffinityMode;
use fascicle_core::distance::mean_direct_flip;
use fascicle_core::resample::resample_all;
use fascicle_core::types::{ResampledStreamline, Streamline};

fn synthetic_population(n: usize, points: usize) -> Vec<ResampledStreamline> {
    let streamlines: Vec<Streamline> = (0..n)
        .map(|k| {
            let y = (k % 17) as f32 * 1.3;
            let z = (k % 5) as f32 * 0.7;
            Streamline::new(
                k,
                (0..32)
                    .map(|i| {
                        let x = i as f32 * 3.0;
                        [x, y + (x * 0.1).sin() * 4.0, z + (x * 0.07).cos() * 2.0]
                    })
                    .collect(),
            )
            .unwrap()
        })
        .collect();
    resample_all(&streamlines, points).unwrap()
}

fn bench_single_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("mean_direct_flip");
    for points in [20usize, 50, 100] {
        let set = synthetic_population(2, points);
        group.bench_with_input(BenchmarkId::from_parameter(points), &set, |b, set| {
            b.iter(|| mean_direct_flip(black_box(&set[0]), black_box(&set[1]), 1).unwrap())
        });
    }
    group.finish();
}

fn bench_affinity_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("affinity_build");
    group.sample_size(10);
    for n in [100usize, 500] {
        let set = synthetic_population(n, 20);
        group.bench_with_input(BenchmarkId::new("dense", n), &set, |b, set| {
            b.iter(|| AffinityMatrix::build(black_box(set), AffinityMode::Dense).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("sparse", n), &set, |b, set| {
            b.iter(|| {
                AffinityMatrix::build(black_box(set), AffinityMode::Sparse { threshold: 5.0 })
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_distance, bench_affinity_build);
criterion_main!(benches);
