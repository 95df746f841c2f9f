//! Statistics reduction benchmarks.
//!
//! Measures the cost of turning a run's samples into `BenchmarkStats` and
//! into an HDR histogram summary, for run sizes around the default of 1000
//! exchanges.
//!
//! Run with: cargo bench -p echobench-bench --bench stats

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use echobench_bench::LatencyHistogram;
use echobench_core::message::{EchoResponse, Request, encode_echo};
use echobench_core::{BenchmarkStats, LatencySample};
use std::hint::black_box;
use std::time::Duration;

/// Deterministic spread of round trips between 50 and 1049 microseconds.
fn synthetic_samples(count: usize) -> Vec<LatencySample> {
    (0..count as u64)
        .map(|i| LatencySample::from_micros(50 + (i * 7919) % 1000))
        .collect()
}

fn benchmark_stats_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats_compute");

    for count in [100, 1000, 10_000] {
        let samples = synthetic_samples(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &samples, |b, s| {
            b.iter(|| {
                black_box(BenchmarkStats::compute(
                    black_box(s),
                    black_box(count as u64 * 120),
                    Duration::from_secs(1),
                ))
            })
        });
    }

    group.finish();
}

fn benchmark_histogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency_histogram");

    for count in [100, 1000, 10_000] {
        let samples = synthetic_samples(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("record", count), &samples, |b, s| {
            b.iter(|| black_box(LatencyHistogram::from_samples(black_box(s)).ok()))
        });
    }

    let histogram = LatencyHistogram::from_samples(&synthetic_samples(10_000))
        .expect("histogram bounds are valid");
    group.bench_function("summary", |b| b.iter(|| black_box(histogram.summary())));

    group.finish();
}

fn benchmark_wire_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire_format");
    group.throughput(Throughput::Elements(1));

    group.bench_function("request", |b| {
        b.iter(|| black_box(Request::new(black_box(742), "Rust client")))
    });

    group.bench_function("encode_echo", |b| {
        b.iter(|| {
            black_box(encode_echo(
                black_box("Message #742 from Rust client"),
                742,
                1_700_000_000_000,
            ))
        })
    });

    let response = encode_echo("Message #742 from Rust client", 742, 1_700_000_000_000);
    group.bench_function("parse_echo", |b| {
        b.iter(|| black_box(EchoResponse::parse(black_box(&response)).ok()))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_stats_compute,
    benchmark_histogram,
    benchmark_wire_format,
);
criterion_main!(benches);
