//! Benchmarks des recherches spatiales

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::{polygon, MultiPolygon};
use geolayers::index::{PolygonIndex, SampleIndex};
use geolayers::{PolygonFeature, SamplePoint};

/// Grille régulière de carrés de `cell` mètres couvrant l'emprise irlandaise
fn polygon_grid(cell: f64) -> Vec<PolygonFeature<u32>> {
    let mut features = Vec::new();
    let mut id = 0u32;
    let mut y = 11_000.0;
    while y < 462_000.0 {
        let mut x = 13_000.0;
        while x < 367_000.0 {
            let square = polygon![
                (x: x, y: y),
                (x: x + cell, y: y),
                (x: x + cell, y: y + cell),
                (x: x, y: y + cell),
                (x: x, y: y),
            ];
            features.push(PolygonFeature {
                id,
                geometry: MultiPolygon::new(vec![square]),
                record: id,
            });
            id += 1;
            x += cell;
        }
        y += cell;
    }
    features
}

fn sample_grid(step: f64) -> Vec<SamplePoint<f64>> {
    let mut samples = Vec::new();
    let mut id = 0u32;
    let mut y = 11_000.0;
    while y < 462_000.0 {
        let mut x = 13_000.0;
        while x < 367_000.0 {
            samples.push(SamplePoint {
                id,
                easting: x,
                northing: y,
                record: y / 1000.0,
            });
            id += 1;
            x += step;
        }
        y += step;
    }
    samples
}

/// Points de requête pseudo-aléatoires déterministes
fn queries(n: usize) -> Vec<(f64, f64)> {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let easting = 13_000.0 + (state % 354_000) as f64;
            let northing = 11_000.0 + ((state >> 20) % 451_000) as f64;
            (easting, northing)
        })
        .collect()
}

fn bench_polygon_lookup(c: &mut Criterion) {
    let points = queries(1_000);
    let mut group = c.benchmark_group("polygon_lookup");
    group.throughput(Throughput::Elements(points.len() as u64));

    for cell in [10_000.0, 2_000.0] {
        let index = PolygonIndex::build(polygon_grid(cell));
        group.bench_with_input(BenchmarkId::from_parameter(index.len()), &index, |b, index| {
            b.iter(|| {
                let mut found = 0usize;
                for &(e, n) in &points {
                    if index.lookup(black_box(e), black_box(n)).is_some() {
                        found += 1;
                    }
                }
                black_box(found)
            })
        });
    }

    group.finish();
}

fn bench_nearest_sample(c: &mut Criterion) {
    let points = queries(1_000);
    let mut group = c.benchmark_group("nearest_sample");
    group.throughput(Throughput::Elements(points.len() as u64));

    for step in [5_000.0, 1_000.0] {
        let index = SampleIndex::build(sample_grid(step), 10_000.0);
        group.bench_with_input(BenchmarkId::from_parameter(index.len()), &index, |b, index| {
            b.iter(|| {
                let mut total = 0.0;
                for &(e, n) in &points {
                    if let Some((_, d)) = index.nearest(black_box(e), black_box(n)) {
                        total += d;
                    }
                }
                black_box(total)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_polygon_lookup, bench_nearest_sample);
criterion_main!(benches);
