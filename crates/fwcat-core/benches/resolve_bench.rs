//! # Resolver Benchmarks
//!
//! Performance benchmarks for fwcat-core resolution.
//!
//! Run with: `cargo bench -p fwcat-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fwcat_core::{DefinitionStore, FrameworkDefinition, Resolver, classify};
use std::hint::black_box;

/// A single chain: fw0 <- fw1 <- ... <- fwN.
fn create_chain_store(size: usize) -> DefinitionStore {
    let definitions = (0..size).map(|i| {
        let definition = FrameworkDefinition::new(format!("fw{i}"))
            .with_param(format!("p{i}"), serde_json::json!(i));
        if i == 0 {
            definition.with_version("stable")
        } else {
            definition.extending(format!("fw{}", i - 1))
        }
    });
    DefinitionStore::from_definitions(definitions).expect("store")
}

/// One root with N direct children (fan-out).
fn create_star_store(size: usize) -> DefinitionStore {
    let definitions = std::iter::once(FrameworkDefinition::new("root").with_version("1.0.0"))
        .chain((1..size).map(|i| FrameworkDefinition::new(format!("leaf{i}")).extending("root")));
    DefinitionStore::from_definitions(definitions).expect("store")
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_chain_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_resolution");

    for size in [10, 100, 1000].iter() {
        let store = create_chain_store(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &store, |b, store| {
            b.iter(|| black_box(Resolver::resolve(store).expect("resolve")));
        });
    }

    group.finish();
}

fn bench_fan_out_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out_resolution");

    for size in [10, 100, 1000].iter() {
        let store = create_star_store(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &store, |b, store| {
            b.iter(|| black_box(Resolver::resolve(store).expect("resolve")));
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify", |b| {
        b.iter(|| {
            for token in ["", "latest", "stable", "0.13.0", "c66f8d", "master"] {
                black_box(classify(black_box(token)));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_chain_resolution,
    bench_fan_out_resolution,
    bench_classify
);
criterion_main!(benches);
