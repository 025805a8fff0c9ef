#![cfg(unix)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use condq_core::{Condvar, CvStatus, MonotonicInstant, TimePoint, clock};
use parking_lot::Mutex;

/// A settable clock: real elapsed time plus an adjustable offset.
struct AdjustableClock {
    offset_ms: AtomicI64,
}

impl AdjustableClock {
    const fn new() -> Self {
        Self {
            offset_ms: AtomicI64::new(0),
        }
    }

    fn now_ms(&self) -> i64 {
        static BASE: OnceLock<Instant> = OnceLock::new();
        let real = i64::try_from(BASE.get_or_init(Instant::now).elapsed().as_millis()).unwrap();
        real + self.offset_ms.load(Ordering::Acquire)
    }

    fn jump(&self, by_ms: i64) {
        self.offset_ms.fetch_add(by_ms, Ordering::AcqRel);
    }

    fn after(&'static self, dur: Duration) -> AdjustablePoint {
        AdjustablePoint {
            clock: self,
            at_ms: self.now_ms() + i64::try_from(dur.as_millis()).unwrap(),
        }
    }
}

struct AdjustablePoint {
    clock: &'static AdjustableClock,
    at_ms: i64,
}

impl TimePoint for AdjustablePoint {
    fn remaining(&self) -> Option<Duration> {
        let left = self.at_ms - self.clock.now_ms();
        (left > 0).then(|| Duration::from_millis(left.unsigned_abs()))
    }
}

#[test]
fn forward_jump_ends_wait_within_poll_ceiling() {
    static CLOCK: AdjustableClock = AdjustableClock::new();
    let state = Mutex::new(());
    let cv = Condvar::new().unwrap();
    let deadline = CLOCK.after(Duration::from_secs(10));

    let jumper = thread::spawn(|| {
        thread::sleep(Duration::from_millis(30));
        CLOCK.jump(60_000);
    });

    let start = Instant::now();
    let mut guard = state.lock();
    assert!(!cv.wait_until_pred(&mut guard, &deadline, |_| false));
    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_secs(3),
        "jump was not noticed within the poll ceiling: {elapsed:?}"
    );
    drop(guard);
    jumper.join().unwrap();
}

#[test]
fn backward_jump_extends_wait() {
    static CLOCK: AdjustableClock = AdjustableClock::new();
    let state = Mutex::new(());
    let cv = Condvar::new().unwrap();
    let deadline = CLOCK.after(Duration::from_millis(100));
    CLOCK.jump(-200);

    let start = Instant::now();
    let mut guard = state.lock();
    assert!(!cv.wait_until_pred(&mut guard, &deadline, |_| false));
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(280),
        "deadline translated against a stale clock reading: {elapsed:?}"
    );
}

#[test]
fn foreign_deadline_is_reached_not_exceeded_early() {
    let state = Mutex::new(());
    let cv = Condvar::new().unwrap();
    let mut guard = state.lock();

    let start = Instant::now();
    let deadline = Instant::now() + Duration::from_millis(250);
    assert!(!cv.wait_until_pred(&mut guard, deadline, |_| false));
    assert!(start.elapsed() >= Duration::from_millis(250));

    let wall = SystemTime::now() + Duration::from_millis(20);
    let mut status = cv.wait_until(&mut guard, wall);
    while status == CvStatus::NoTimeout {
        status = cv.wait_until(&mut guard, wall);
    }
    assert!(SystemTime::now() >= wall);
}

#[test]
fn notification_ends_foreign_wait_early() {
    let shared = Arc::new((Mutex::new(false), Condvar::new().unwrap()));
    let setter = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let (state, cv) = &*shared;
            *state.lock() = true;
            cv.notify_all();
        })
    };

    let (state, cv) = &*shared;
    let start = Instant::now();
    let mut guard = state.lock();
    let deadline = SystemTime::now() + Duration::from_secs(30);
    assert!(cv.wait_until_pred(&mut guard, deadline, |ready| *ready));
    assert!(start.elapsed() < Duration::from_secs(10));
    drop(guard);
    setter.join().unwrap();
}

#[test]
fn bounded_translation_never_exceeds_ceiling() {
    static CLOCK: AdjustableClock = AdjustableClock::new();
    let far = CLOCK.after(Duration::from_secs(3600));
    let ceiling = Duration::from_millis(100);
    let before = MonotonicInstant::now();
    let bounded = clock::bounded_deadline(&far, ceiling).unwrap();
    let after = MonotonicInstant::now();
    assert!(bounded >= before.saturating_add(ceiling));
    assert!(bounded <= after.saturating_add(ceiling));
    assert!(clock::internal_deadline(&far).unwrap() > bounded);
}
