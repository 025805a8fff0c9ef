//! Condition variable overhead benchmarks.
//!
//! Measures the uncontended notify paths, a deadline that has already passed
//! (no native wait), and a full ping-pong handoff between two threads.

use std::cell::RefCell;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use condq_core::{Condvar, MonotonicInstant};
use condq_sys::{NativeCond, NativeMutex};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use parking_lot::Mutex;

#[derive(Default)]
struct BenchStats {
    samples_ns_per_op: Vec<f64>,
    total_iters: u64,
    total_ns: u128,
}

impl BenchStats {
    fn record(&mut self, iters: u64, dur: Duration) {
        let ns = dur.as_nanos();
        self.total_iters = self.total_iters.saturating_add(iters);
        self.total_ns = self.total_ns.saturating_add(ns);
        self.samples_ns_per_op.push(ns as f64 / iters as f64);
    }

    fn report(&self, bench_label: &str) {
        let mut samples = self.samples_ns_per_op.clone();
        if samples.is_empty() {
            return;
        }
        samples.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let p50 = percentile_sorted(&samples, 0.50);
        let p99 = percentile_sorted(&samples, 0.99);
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let throughput_ops_s = if self.total_ns == 0 {
            0.0
        } else {
            (self.total_iters as f64) / (self.total_ns as f64 / 1e9)
        };
        println!(
            "CONDVAR_BENCH bench={bench_label} samples={} p50_ns_op={p50:.3} p99_ns_op={p99:.3} mean_ns_op={mean:.3} throughput_ops_s={throughput_ops_s:.3}",
            samples.len(),
        );
    }
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    debug_assert!((0.0..=1.0).contains(&p));
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn timed(stats: &RefCell<BenchStats>, iters: u64, mut op: impl FnMut()) -> Duration {
    let start = Instant::now();
    for _ in 0..iters {
        op();
    }
    let dur = start.elapsed().max(Duration::from_nanos(1));
    stats.borrow_mut().record(iters, dur);
    dur
}

fn bench_condvar(c: &mut Criterion) {
    let mut group = c.benchmark_group("condvar");
    group.throughput(Throughput::Elements(1));

    // Bare native signal, for comparison with notify_one.
    {
        let _mutex = NativeMutex::new().expect("native mutex");
        let cond = NativeCond::new().expect("native cond");
        let stats = RefCell::new(BenchStats::default());
        group.bench_function(BenchmarkId::new("native_signal", "no_waiters"), |b| {
            b.iter_custom(|iters| timed(&stats, iters, || black_box(cond.signal()).expect("signal")));
        });
        stats.borrow().report("native_signal");
    }

    for (label, all) in [("notify_one", false), ("notify_all", true)] {
        let cv = Condvar::new().expect("condvar");
        let stats = RefCell::new(BenchStats::default());
        group.bench_function(BenchmarkId::new(label, "no_waiters"), |b| {
            b.iter_custom(|iters| {
                timed(&stats, iters, || {
                    if all {
                        cv.notify_all();
                    } else {
                        cv.notify_one();
                    }
                })
            });
        });
        stats.borrow().report(label);
    }

    // Deadlines already in the past must not reach the native wait.
    {
        let cv = Condvar::new().expect("condvar");
        let state = Mutex::new(0_u64);
        let past = MonotonicInstant::now();
        let stats = RefCell::new(BenchStats::default());
        group.bench_function(BenchmarkId::new("wait_until", "expired"), |b| {
            b.iter_custom(|iters| {
                let mut guard = state.lock();
                let dur = timed(&stats, iters, || {
                    black_box(cv.wait_until(&mut guard, past));
                });
                dur
            });
        });
        stats.borrow().report("wait_until_expired");
    }

    {
        let cv = Condvar::new().expect("condvar");
        let state = Mutex::new(false);
        let stats = RefCell::new(BenchStats::default());
        group.bench_function(BenchmarkId::new("wait_for_pred", "already_true"), |b| {
            b.iter_custom(|iters| {
                let mut guard = state.lock();
                *guard = true;
                let dur = timed(&stats, iters, || {
                    black_box(cv.wait_for_pred(&mut guard, Duration::from_secs(1), |ready| *ready));
                });
                dur
            });
        });
        stats.borrow().report("wait_for_pred_already_true");
    }

    // Two threads alternating turns through one condvar.
    {
        let shared = Arc::new((Mutex::new((0_u64, false)), Condvar::new().expect("condvar")));
        let stats = RefCell::new(BenchStats::default());
        group.bench_function(BenchmarkId::new("ping_pong", "two_threads"), |b| {
            b.iter_custom(|iters| {
                let peer = {
                    let shared = Arc::clone(&shared);
                    thread::spawn(move || {
                        let (state, cv) = &*shared;
                        let mut guard = state.lock();
                        for _ in 0..iters {
                            cv.wait_pred(&mut guard, |(_, ping)| *ping);
                            guard.1 = false;
                            cv.notify_all();
                        }
                    })
                };
                let (state, cv) = &*shared;
                let dur = timed(&stats, iters, || {
                    let mut guard = state.lock();
                    guard.0 += 1;
                    guard.1 = true;
                    cv.notify_all();
                    cv.wait_pred(&mut guard, |(_, ping)| !*ping);
                });
                peer.join().expect("peer thread");
                dur
            });
        });
        stats.borrow().report("ping_pong");
    }

    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(100))
        .measurement_time(Duration::from_secs(2))
        .sample_size(50);
    targets = bench_condvar
);
criterion_main!(benches);
