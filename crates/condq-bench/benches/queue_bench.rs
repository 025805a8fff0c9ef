//! Queue core and view benchmarks.

use std::cell::RefCell;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use condq_core::queue::{back, front};
use condq_core::{DequeBase, SyncDeque};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

#[derive(Default)]
struct BenchStats {
    samples_ns_per_op: Vec<f64>,
}

impl BenchStats {
    fn record(&mut self, iters: u64, dur: Duration) {
        self.samples_ns_per_op
            .push(dur.as_nanos() as f64 / iters as f64);
    }

    fn report(&self, bench_label: &str) {
        let mut samples = self.samples_ns_per_op.clone();
        if samples.is_empty() {
            return;
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let p50 = samples[samples.len() / 2];
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        println!(
            "QUEUE_BENCH bench={bench_label} samples={} p50_ns_op={p50:.3} mean_ns_op={mean:.3}",
            samples.len()
        );
    }
}

fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1));

    // Single-thread push then pull through the two views.
    {
        let core = SyncDeque::new().expect("queue");
        let (producer, consumer) = (back(&core), front(&core));
        let stats = RefCell::new(BenchStats::default());
        group.bench_function(BenchmarkId::new("view_round_trip", "uncontended"), |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();
                for i in 0..iters {
                    producer.push(black_box(i)).expect("push");
                    black_box(consumer.try_pull().expect("pull"));
                }
                let dur = start.elapsed().max(Duration::from_nanos(1));
                stats.borrow_mut().record(iters, dur);
                dur
            });
        });
        stats.borrow().report("view_round_trip");
    }

    {
        let core = SyncDeque::<u64>::new().expect("queue");
        let stats = RefCell::new(BenchStats::default());
        group.bench_function(BenchmarkId::new("try_pull", "empty"), |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();
                for _ in 0..iters {
                    black_box(core.try_pull_front()).ok();
                }
                let dur = start.elapsed().max(Duration::from_nanos(1));
                stats.borrow_mut().record(iters, dur);
                dur
            });
        });
        stats.borrow().report("try_pull_empty");
    }

    // Producer thread against a bounded queue; the consumer blocks.
    for capacity in [1_usize, 64] {
        let stats = RefCell::new(BenchStats::default());
        group.bench_function(BenchmarkId::new("spsc_bounded", capacity), |b| {
            b.iter_custom(|iters| {
                let core = Arc::new(SyncDeque::with_capacity(capacity).expect("queue"));
                let producer = {
                    let core = Arc::clone(&core);
                    thread::spawn(move || {
                        let view = back(&*core);
                        for i in 0..iters {
                            view.push(i).expect("push");
                        }
                    })
                };
                let consumer = front(&*core);
                let start = Instant::now();
                for _ in 0..iters {
                    black_box(consumer.pull().expect("pull"));
                }
                let dur = start.elapsed().max(Duration::from_nanos(1));
                producer.join().expect("producer thread");
                stats.borrow_mut().record(iters, dur);
                dur
            });
        });
        stats.borrow().report(&format!("spsc_bounded_{capacity}"));
    }

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(100))
        .measurement_time(Duration::from_secs(2))
        .sample_size(50);
    targets = bench_queue
);
criterion_main!(benches);
