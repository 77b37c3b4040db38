use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use memoizer_core::{CacheKey, Memoizer, Scope, SetOptions};
use serde::Serialize;
use std::collections::HashMap;
use std::hint::black_box;
use std::thread;

#[derive(Serialize)]
struct Query {
    table: &'static str,
    filters: HashMap<String, i64>,
    limit: u32,
}

fn query(n: i64) -> Query {
    Query {
        table: "users",
        filters: (0..8).map(|i| (format!("column{}", i), n + i)).collect(),
        limit: 50,
    }
}

fn bench_key_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_derivation");

    group.bench_function("scalars", |b| {
        b.iter(|| CacheKey::derive(black_box(&(42u64, "two", true))))
    });

    let nested = query(7);
    group.bench_function("nested_struct", |b| {
        b.iter(|| CacheKey::derive(black_box(&(&nested, 3u8))))
    });

    for len in [10, 100, 1000].iter() {
        let ids: Vec<u64> = (0..*len).collect();
        group.bench_with_input(BenchmarkId::new("components", len), &ids, |b, ids| {
            b.iter(|| CacheKey::derive(black_box(ids)))
        });
    }

    group.finish();
}

fn bench_get_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_sequential");

    for size in [10, 100, 1000].iter() {
        let cache = Memoizer::new();
        let scope = Scope::new("bench");
        for i in 0..*size {
            cache.set(&scope, &(i,), Some(i * 2), SetOptions::new()).unwrap();
        }

        group.bench_with_input(BenchmarkId::new("hit", size), size, |b, &size| {
            b.iter(|| {
                for i in 0..size {
                    black_box(cache.get::<u64, _>(&scope, &(i,)).unwrap());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("miss", size), size, |b, &size| {
            b.iter(|| {
                for i in size..size * 2 {
                    black_box(cache.get::<u64, _>(&scope, &(i,)).unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_set_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_sequential");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("plain", size), size, |b, &size| {
            b.iter(|| {
                let cache = Memoizer::new();
                let scope = Scope::new("bench");
                for i in 0..size {
                    cache.set(&scope, &(i,), Some(i), SetOptions::new()).unwrap();
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("with_max_age", size), size, |b, &size| {
            b.iter(|| {
                let cache = Memoizer::new();
                let scope = Scope::new("bench");
                for i in 0..size {
                    cache
                        .set(&scope, &(i,), Some(i), SetOptions::new().max_age_ms(60_000))
                        .unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_concurrent_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_reads");

    let cache = Memoizer::new();
    let scope = Scope::new("shared");
    for i in 0..100u64 {
        cache.set(&scope, &(i,), Some(i), SetOptions::new()).unwrap();
    }

    for num_threads in [2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                b.iter(|| {
                    let handles: Vec<_> = (0..num_threads)
                        .map(|_| {
                            let cache = cache.clone();
                            let scope = scope.clone();
                            thread::spawn(move || {
                                for i in 0..100u64 {
                                    black_box(cache.get::<u64, _>(&scope, &(i,)).unwrap());
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_key_derivation,
    bench_get_sequential,
    bench_set_sequential,
    bench_concurrent_reads
);
criterion_main!(benches);
