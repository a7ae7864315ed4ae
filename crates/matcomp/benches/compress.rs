//! Benchmarks for planning, encoding and quantized compression.
//!
//! Run with: `cargo bench -p matcomp`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use matcomp::prelude::*;
use matcomp::CoCodePlanner;
use matcomp::Objective;

/// Generate a block whose columns draw from `cardinality` distinct values,
/// with every other column a copy of its neighbour scaled by ten.
fn generate_block(rows: usize, cols: usize, cardinality: u32) -> MatrixBlock {
    let mut rng = StdRng::seed_from_u64(42);
    let mut values = Vec::with_capacity(rows * cols);
    for _ in 0..rows {
        let mut previous = 0.0;
        for c in 0..cols {
            let v = if c % 2 == 1 {
                previous * 10.0
            } else {
                f64::from(rng.gen_range(0..cardinality))
            };
            previous = v;
            values.push(v);
        }
    }
    MatrixBlock::dense(rows, cols, values).unwrap()
}

fn bench_compress_threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_threads");
    let input = Arc::new(generate_block(100_000, 8, 16));
    let factory =
        CompressedMatrixFactory::new(CompressionSettings::default().with_mode(CompressionMode::True));

    group.throughput(Throughput::Bytes(input.in_memory_size() as u64));
    for threads in [1, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                factory
                    .compress(black_box(&input), None, threads, None)
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_cardinality(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_cardinality");
    let factory =
        CompressedMatrixFactory::new(CompressionSettings::default().with_mode(CompressionMode::True));

    for cardinality in [2, 64, 4096] {
        let input = Arc::new(generate_block(50_000, 6, cardinality));
        group.throughput(Throughput::Bytes(input.in_memory_size() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(cardinality),
            &input,
            |b, input| b.iter(|| factory.compress(black_box(input), None, 4, None).unwrap()),
        );
    }

    group.finish();
}

fn bench_quantized(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_quantized");
    let input = Arc::new(generate_block(100_000, 8, 1000));
    let factory =
        CompressedMatrixFactory::new(CompressionSettings::default().with_mode(CompressionMode::True));

    for scale in [0.5, 0.01] {
        let quant = QuantizationOperand::Scalar(scale);
        group.bench_with_input(BenchmarkId::from_parameter(scale), &quant, |b, quant| {
            b.iter(|| {
                factory
                    .compress(black_box(&input), Some(quant), 4, None)
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("cocode_plan");
    let settings = CompressionSettings::default();

    for cols in [4, 16, 32] {
        let input = generate_block(20_000, cols, 32);
        group.bench_with_input(BenchmarkId::from_parameter(cols), &input, |b, input| {
            b.iter(|| {
                CoCodePlanner::new(black_box(input), None, &settings)
                    .unwrap()
                    .plan(Objective::Size)
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compress_threads,
    bench_cardinality,
    bench_quantized,
    bench_planning,
);

criterion_main!(benches);
