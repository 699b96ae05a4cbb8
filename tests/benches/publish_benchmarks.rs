//! # Event Aggregator Benchmarks
//!
//! | Scenario | What it measures |
//! |----------|------------------|
//! | publish_direct | Exact-type match across N subscribers |
//! | publish_covariant | Match two lineage levels up across N subscribers |
//! | publish_unmatched | Cost of skipping subscribers that handle nothing relevant |
//! | subscribe_churn | Subscribe + unsubscribe round trip against a populated registry |

use std::sync::Arc;
use std::time::Duration;

use aggregator_tests::fixtures::{click, Tally, Tick, UiEvent};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use event_aggregator::{EventAggregator, Subscriber};

struct Deaf;
impl Subscriber for Deaf {}

fn populated<S: Subscriber>(make: impl Fn() -> S, count: usize) -> (EventAggregator, Vec<Arc<S>>) {
    let bus = EventAggregator::new();
    let subs: Vec<_> = (0..count).map(|_| Arc::new(make())).collect();
    for sub in &subs {
        bus.subscribe(sub);
    }
    (bus, subs)
}

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    group.measurement_time(Duration::from_secs(5));

    for size in [1, 10, 100, 1000] {
        let (bus, _subs) = populated(Tally::default, size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("publish_direct", size), &size, |b, _| {
            b.iter(|| bus.publish(black_box(Tick(1))).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("publish_covariant", size), &size, |b, _| {
            b.iter(|| bus.publish(black_box(click(1, 2))).unwrap())
        });

        let (deaf_bus, _deaf) = populated(|| Deaf, size);
        group.bench_with_input(BenchmarkId::new("publish_unmatched", size), &size, |b, _| {
            b.iter(|| deaf_bus.publish(black_box(UiEvent::default())).unwrap())
        });
    }

    group.finish();
}

fn bench_subscribe_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    for size in [10, 1000] {
        let (bus, _subs) = populated(Tally::default, size);
        let extra = Arc::new(Tally::default());

        group.bench_with_input(BenchmarkId::new("subscribe_churn", size), &size, |b, _| {
            b.iter(|| {
                bus.subscribe(&extra);
                bus.unsubscribe(&extra)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_publish, bench_subscribe_churn);
criterion_main!(benches);
