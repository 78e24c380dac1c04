//! Handoff queue benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use osprey_queue::BlockingQueue;

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_try_pop", |b| {
        let queue: BlockingQueue<u64> = BlockingQueue::new();

        b.iter(|| {
            black_box(queue.push(42));
            black_box(queue.try_pop());
        })
    });

    group.finish();
}

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_throughput");
    group.throughput(Throughput::Elements(10000));

    group.bench_function("10k_messages", |b| {
        b.iter_batched(
            BlockingQueue::<u64>::new,
            |queue| {
                for i in 0..10000u64 {
                    queue.push(i);
                }
                for _ in 0..10000 {
                    black_box(queue.try_pop());
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_throughput);
criterion_main!(benches);
