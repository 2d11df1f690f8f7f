//! Benchmarks for the thresholding pipeline stages

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use landmask_algorithms::refine::{filter_small_components, Connectivity};
use landmask_algorithms::threshold::{normalize, threshold, ThresholdRule};
use landmask_algorithms::vectorize::vectorize;
use landmask_core::{GeoTransform, Raster, Region};

fn create_index(size: usize) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64 * 10.0, 10.0, -10.0));
    for row in 0..size {
        for col in 0..size {
            let v = ((row * 7 + col * 13) % 200) as f64 / 200.0;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn bench_normalize_threshold(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/normalize_threshold");
    for size in [256, 512, 1024] {
        let index = create_index(size);
        let region = Region::covering(&index);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let n = normalize(black_box(&index), &region, 10.0).unwrap();
                threshold(&n, &region, 10.0, ThresholdRule::gt(0.25)).unwrap()
            })
        });
    }
    group.finish();
}

fn bench_refine_vectorize(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/refine_vectorize");
    for size in [256, 512, 1024] {
        let index = create_index(size);
        let region = Region::covering(&index);
        let n = normalize(&index, &region, 10.0).unwrap();
        let mask = threshold(&n, &region, 10.0, ThresholdRule::gt(0.25)).unwrap().mask;
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let refined = filter_small_components(black_box(&mask), 10, Connectivity::Eight);
                vectorize(&refined, &region, 10.0).unwrap().count()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize_threshold, bench_refine_vectorize);
criterion_main!(benches);
