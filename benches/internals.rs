use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use defbench::display;
use defbench::record::{self, TestRun};
use defbench::{History, Measurement};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Synthetic memory series: a baseline followed by a slow sawtooth.
fn make_samples(len: usize) -> Vec<f64> {
    (0..len).map(|i| 48.0 + (i % 64) as f64 * 0.125).collect()
}

/// Build a record without running anything. Every record also lands in the
/// global history, which is fine for benchmarks.
fn make_run(index: usize, samples: usize) -> Arc<TestRun> {
    let measurement = Measurement {
        total_elapsed: Duration::from_micros(200 + index as u64 * 13),
        memory: make_samples(samples),
        stdout: String::new(),
        stderr: String::new(),
        started_at: Utc::now(),
    };
    TestRun::record("benches::make_run", format!("workload_{}", index), 1000, measurement).unwrap()
}

// ---------------------------------------------------------------------------
// Benchmarks: record
// ---------------------------------------------------------------------------

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for &size in &[10, 100, 1000, 10000] {
        let samples = make_samples(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &samples, |b, s| {
            b.iter(|| record::normalize(s).unwrap());
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmarks: history
// ---------------------------------------------------------------------------

fn bench_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("history");

    for &size in &[10, 100, 1000] {
        let history = History::new();
        for i in 0..size {
            history.add(make_run(i, 16));
        }
        group.bench_with_input(BenchmarkId::new("average_time", size), &history, |b, h| {
            b.iter(|| h.average_time());
        });
        group.bench_with_input(BenchmarkId::new("get_where", size), &history, |b, h| {
            b.iter(|| h.get_where(|r| r.name().ends_with('7')));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmarks: display
// ---------------------------------------------------------------------------

fn bench_display(c: &mut Criterion) {
    let runs_5: Vec<Arc<TestRun>> = (0..5).map(|i| make_run(i, 32)).collect();
    let runs_20: Vec<Arc<TestRun>> = (0..20).map(|i| make_run(i, 32)).collect();

    let mut group = c.benchmark_group("display");

    group.bench_function("format_default", |b| {
        b.iter(|| display::format_default(&runs_5[0]));
    });
    group.bench_function("format_short_5", |b| {
        b.iter(|| display::format_short(&runs_5));
    });
    group.bench_function("format_json_5", |b| {
        b.iter(|| display::format_json(&runs_5));
    });
    group.bench_function("format_short_20", |b| {
        b.iter(|| display::format_short(&runs_20));
    });
    group.bench_function("format_json_20", |b| {
        b.iter(|| display::format_json(&runs_20));
    });

    group.finish();
}

fn bench_format_significant(c: &mut Criterion) {
    let values = [
        ("tiny", 0.0000123),
        ("small", 0.0002124),
        ("unit", 1.5),
        ("large", 123456.0),
    ];

    let mut group = c.benchmark_group("format_significant");
    for (name, value) in &values {
        group.bench_with_input(BenchmarkId::new("value", name), value, |b, v| {
            b.iter(|| display::format_significant(*v, 4));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Criterion groups
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_normalize,
    bench_history,
    bench_display,
    bench_format_significant,
);
criterion_main!(benches);
