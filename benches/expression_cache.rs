//! Expression cache benchmarks
//!
//! Compares compilation with and without the shared cache, and measures
//! lookup cost under contention:
//! - Cache modes (soft, bounded, disabled)
//! - Thread counts (1, 4, 8)
//!
//! Run benchmarks: `cargo bench --bench expression_cache`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use objpath::{CacheConfig, EngineConfig, PathEngine, ReclamationMode};
use std::hint::black_box;
use std::sync::Arc;

const EXPRESSIONS: [&str; 4] = [
    "/orders[status = 'open']/lines[qty > 1]/sku",
    "sum(/orders/lines/price) div count(/orders/lines)",
    "//customer[starts-with(name, 'A')]/address/city",
    "/orders[last()]/lines[position() < 3]",
];

fn engine_with(cache: CacheConfig) -> Arc<PathEngine> {
    PathEngine::new(EngineConfig::default().with_cache(cache))
}

/// Benchmark compilation through each cache mode
fn benchmark_cache_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_modes");
    group.throughput(Throughput::Elements(EXPRESSIONS.len() as u64));

    let modes = [
        ("soft", CacheConfig::default().with_mode(ReclamationMode::Soft)),
        ("bounded", CacheConfig::default().with_mode(ReclamationMode::Bounded)),
        ("disabled", CacheConfig::disabled()),
    ];

    for (label, cache) in modes {
        let engine = engine_with(cache);
        group.bench_function(label, |b| {
            b.iter(|| {
                for xpath in EXPRESSIONS {
                    black_box(engine.compile(xpath).expect("Failed to compile"));
                }
            })
        });
    }

    group.finish();
}

/// Benchmark cache lookups from several threads at once
fn benchmark_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");

    for threads in [1, 4, 8] {
        group.throughput(Throughput::Elements((threads * 100) as u64));
        let engine = engine_with(CacheConfig::default());

        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, &threads| {
            b.iter(|| {
                std::thread::scope(|scope| {
                    for t in 0..threads {
                        let engine = &engine;
                        scope.spawn(move || {
                            for i in 0..100 {
                                let xpath = EXPRESSIONS[(t + i) % EXPRESSIONS.len()];
                                black_box(engine.compile(xpath).expect("Failed to compile"));
                            }
                        });
                    }
                })
            })
        });
    }

    group.finish();
}

/// Benchmark eviction once the bounded cache is full
fn benchmark_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("eviction");
    let sources: Vec<String> = (0..1000).map(|i| format!("/items[{}]/name", i)).collect();

    for capacity in [100, 1000] {
        let engine = engine_with(
            CacheConfig::default()
                .with_capacity(capacity)
                .with_mode(ReclamationMode::Bounded),
        );

        group.bench_with_input(BenchmarkId::new("capacity", capacity), &capacity, |b, _| {
            b.iter(|| {
                for source in &sources {
                    black_box(engine.compile(source).expect("Failed to compile"));
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_cache_modes,
    benchmark_contention,
    benchmark_eviction
);
criterion_main!(benches);
