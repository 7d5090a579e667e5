//! # Encode Benchmarks
//!
//! Measures per-unit classification, per-layer sorting and frequency
//! aggregation at the default 50 identities x 10 samples.
//!
//! Run: `cargo bench --bench encode_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sil_selectivity::prelude::*;
use sil_selectivity::{frequency, sorter};

/// Deterministic pseudo-responses; every 7th unit fires for one identity
fn layer(config: &EncodeConfig, units: usize) -> ResponseMatrix {
    let columns: Vec<Vec<f64>> = (0..units)
        .map(|u| {
            (0..config.presentations())
                .map(|row| {
                    let identity = row / config.num_samples;
                    let noise = ((row * 31 + u * 17) as f64).sin().abs();
                    if u % 7 == 0 && identity == u % config.num_classes {
                        noise + 8.0
                    } else {
                        noise
                    }
                })
                .collect()
        })
        .collect();
    ResponseMatrix::from_columns(&columns).expect("rectangular columns")
}

fn bench_classify_unit(c: &mut Criterion) {
    let config = EncodeConfig::default();
    let matrix = layer(&config, 1);
    let response = matrix.column(0);

    c.bench_function("classify_unit_50x10", |b| {
        b.iter(|| black_box(classify_unit(black_box(&response), &config)))
    });
}

fn bench_classify_layer(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_layer");
    let config = EncodeConfig::default();
    let pool = sorter::build_pool(Workers::All).expect("pool");

    for units in [64usize, 512, 4096] {
        let matrix = layer(&config, units);
        group.throughput(Throughput::Elements(units as u64));
        group.bench_with_input(BenchmarkId::new("units", units), &matrix, |b, m| {
            b.iter(|| black_box(sorter::classify_layer(m, &config, &pool)))
        });
    }

    group.finish();
}

fn bench_frequency(c: &mut Criterion) {
    let mut group = c.benchmark_group("frequency");
    let config = EncodeConfig::default();
    let pool = sorter::build_pool(Workers::All).expect("pool");
    let resolved = taxonomy::resolve(taxonomy::category_names()).expect("registry");

    for units in [512usize, 4096] {
        let matrix = layer(&config, units);
        let partition = SignificancePartition::new((0..units).step_by(2), units).expect("partition");
        let (encodings, sort) = sorter::sort_layer(&matrix, &partition, &config, &pool).expect("sort");
        let selected = sort.select(&resolved);

        group.bench_with_input(BenchmarkId::new("layer_frequency", units), &selected, |b, s| {
            b.iter(|| black_box(frequency::layer_frequency(s, &encodings, units, config.num_classes)))
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    c.bench_function("resolve_all_categories", |b| {
        b.iter(|| black_box(taxonomy::resolve(taxonomy::category_names())))
    });
}

criterion_group!(
    benches,
    bench_classify_unit,
    bench_classify_layer,
    bench_frequency,
    bench_resolve,
);

criterion_main!(benches);
