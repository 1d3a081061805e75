//! Overhead the bridge adds around a benchmark run
//!
//! - Statistics over per-run samples at various run counts
//! - Report rendering into an in-memory sink
//! - Catalog lookup for a cached class

use std::time::Duration;

use bench_test_bridge::demo::MapPopulationBenchmarks;
use bench_test_bridge::engine::stats::{BenchmarkStat, MetricStatistics, RunSample};
use bench_test_bridge::{
    AssertionOutcome, BenchmarkCatalog, BenchmarkRunResult, BufferSink, Metric, ReportEmitter,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn samples(n: usize) -> Vec<RunSample> {
    (0..n)
        .map(|i| RunSample {
            elapsed: Duration::from_micros(500 + (i as u64 * 37) % 200),
            invocations: 1 + (i as u64 % 4),
            value: 1024.0 + (i as f64 * 13.0) % 512.0,
        })
        .collect()
}

/// Benchmark statistics over growing run counts
fn bench_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats");
    for runs in [3usize, 10, 100, 1_000] {
        let runs_data = samples(runs);
        let values: Vec<f64> = runs_data.iter().map(|r| r.value).collect();

        group.bench_with_input(BenchmarkId::new("benchmark_stat", runs), &values, |b, values| {
            b.iter(|| BenchmarkStat::from_values(black_box(values)))
        });

        group.bench_with_input(
            BenchmarkId::new("metric_statistics", runs),
            &runs_data,
            |b, runs_data| {
                b.iter(|| MetricStatistics::from_runs("bytes", black_box(runs_data.clone())))
            },
        );
    }
    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let result = BenchmarkRunResult {
        method: "add_memory".to_string(),
        description: "add_memory".to_string(),
        assertions: vec![AssertionOutcome {
            passed: true,
            message: concat!(
                "[PASS] Expected [Memory] TotalBytesAllocated to must be less than ",
                "2048.00 bytes; actual value was 1024.00 bytes."
            )
            .to_string(),
        }],
        metrics: vec![
            (
                Metric::TotalBytesAllocated,
                MetricStatistics::from_runs("bytes", samples(10)),
            ),
            (Metric::ElapsedTime, MetricStatistics::from_runs("ms", samples(10))),
        ],
        elapsed: Duration::from_micros(500),
        exceptions: Vec::new(),
    };

    c.bench_function("report_emit", |b| {
        b.iter(|| {
            let sink = BufferSink::new();
            ReportEmitter::emit(black_box(&result), &sink);
            black_box(sink)
        })
    });
}

fn bench_catalog(c: &mut Criterion) {
    c.bench_function("catalog_resolve", |b| {
        b.iter(|| {
            BenchmarkCatalog::for_class::<MapPopulationBenchmarks>()
                .resolve(black_box("add_memory_test_theory"))
                .map(|d| d.assertions.len())
        })
    });
}

criterion_group!(benches, bench_stats, bench_report, bench_catalog);
criterion_main!(benches);
