//! Benchmarks for normalization and feature extraction
//!
//! Run with: cargo bench --package csi-stream-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use std::time::Duration;

use csi_stream_core::features::extract_all;
use csi_stream_core::{EngineConfig, Normalizer, StreamController, ViewState};

/// Raw positional record with a slow sinusoid across subcarriers
fn raw_record(tick: usize, subcarriers: usize) -> Value {
    let amplitudes: Vec<f64> = (0..subcarriers)
        .map(|j| 15.0 + 5.0 * ((j as f64) * 0.1 + tick as f64 * 0.3).sin())
        .collect();
    json!({"topic": "bench/csi", "CSIs": amplitudes})
}

fn filled_controller(capacity: usize, subcarriers: usize) -> StreamController {
    let config = EngineConfig {
        buffer_capacity: capacity,
        ..EngineConfig::default()
    };
    let mut controller = match StreamController::new(config) {
        Ok(c) => c,
        Err(e) => panic!("bench config rejected: {e}"),
    };
    for tick in 0..capacity {
        controller.ingest(&raw_record(tick, subcarriers));
    }
    controller
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("Normalize");
    let normalizer = Normalizer::default();

    for &subcarriers in &[64usize, 128, 256] {
        let positional = raw_record(0, subcarriers);
        let delimited = json!({
            "raw_payload": (0..subcarriers).map(|j| format!("{}.5", j % 40)).collect::<Vec<_>>().join(", ")
        });

        group.throughput(Throughput::Elements(subcarriers as u64));
        group.bench_with_input(BenchmarkId::new("positional", subcarriers), &positional, |b, raw| {
            b.iter(|| normalizer.normalize(black_box(raw)))
        });
        group.bench_with_input(BenchmarkId::new("delimited", subcarriers), &delimited, |b, raw| {
            b.iter(|| normalizer.normalize(black_box(raw)))
        });
    }
    group.finish();
}

fn bench_extract_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("Feature Extraction");
    group.measurement_time(Duration::from_secs(5));

    for &(capacity, subcarriers) in &[(100usize, 64usize), (100, 256), (500, 256)] {
        let controller = filled_controller(capacity, subcarriers);
        let view = ViewState::for_topic("bench/csi");

        group.throughput(Throughput::Elements(capacity as u64));
        group.bench_function(BenchmarkId::new("extract_all", format!("{capacity}x{subcarriers}")), |b| {
            b.iter(|| {
                let records = controller.records();
                extract_all(
                    black_box(&records),
                    &view,
                    &controller.config().features,
                    controller.revision(),
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_extract_all);
criterion_main!(benches);
