//! Benchmarks for observation, tracked reads, and notification.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use watchtree_core::{observe, Value, Watcher};

fn wide_object(keys: usize) -> Value {
    let map: serde_json::Map<String, serde_json::Value> = (0..keys)
        .map(|i| (format!("k{i}"), serde_json::Value::from(i)))
        .collect();
    Value::from(serde_json::Value::Object(map))
}

fn observe_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe");
    for keys in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("wide_object", keys), &keys, |b, &keys| {
            b.iter_with_setup(|| wide_object(keys), |value| black_box(observe(&value, false)));
        });
    }
    group.finish();
}

fn tracking_benchmarks(c: &mut Criterion) {
    c.bench_function("watcher_read_100_keys", |b| {
        let value = wide_object(100);
        observe(&value, false);
        let object = value.as_object().unwrap().clone();
        let watcher = Watcher::new(move || {
            for i in 0..100 {
                black_box(object.get(&format!("k{i}")));
            }
            Value::Undefined
        });
        b.iter(|| watcher.run());
    });

    c.bench_function("write_notify_10_watchers", |b| {
        let value = wide_object(1);
        observe(&value, false);
        let object = value.as_object().unwrap().clone();
        let _watchers: Vec<_> = (0..10)
            .map(|_| {
                let view = object.clone();
                Watcher::new(move || view.get("k0"))
            })
            .collect();

        let mut n = 0i64;
        b.iter(|| {
            n += 1;
            object.assign("k0", Value::from(n));
        });
    });
}

criterion_group!(benches, observe_benchmarks, tracking_benchmarks);
criterion_main!(benches);
