#![cfg(unix)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use condq_sys::{
    HandleFactory, MonotonicInstant, NativeCond, NativeMutex, OsHandles, WaitOutcome,
    handle_counters_for_tests,
};

static TEST_GUARD_HELD: AtomicBool = AtomicBool::new(false);

struct TestGuard;

impl Drop for TestGuard {
    fn drop(&mut self) {
        TEST_GUARD_HELD.store(false, Ordering::Release);
    }
}

fn acquire_test_guard() -> TestGuard {
    loop {
        if TEST_GUARD_HELD
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return TestGuard;
        }
        std::thread::yield_now();
    }
}

#[test]
fn create_and_drop_balances_counters() {
    let _guard = acquire_test_guard();
    let before = handle_counters_for_tests();

    let mutex = OsHandles.create_mutex().unwrap();
    let cond = OsHandles.create_cond().unwrap();
    let during = handle_counters_for_tests();
    assert_eq!(during.mutex_inits, before.mutex_inits + 1);
    assert_eq!(during.cond_inits, before.cond_inits + 1);
    assert_eq!(during.live_mutexes(), before.live_mutexes() + 1);

    drop(cond);
    drop(mutex);
    let after = handle_counters_for_tests();
    assert_eq!(after.live_mutexes(), before.live_mutexes());
    assert_eq!(after.live_conds(), before.live_conds());
}

#[test]
fn moved_handles_keep_working() {
    let _guard = acquire_test_guard();
    let mutex = NativeMutex::new().unwrap();
    let addr = mutex.as_raw();
    let moved = vec![mutex];
    assert_eq!(moved[0].as_raw(), addr);
    drop(moved[0].lock().unwrap());
}

#[test]
fn timed_wait_past_deadline_times_out() {
    let _guard = acquire_test_guard();
    let mutex = NativeMutex::new().unwrap();
    let cond = NativeCond::new().unwrap();
    let mut held = mutex.lock().unwrap();
    let deadline = MonotonicInstant::now().saturating_add(Duration::from_millis(10));
    let mut outcome = cond.wait_until(&mut held, deadline).unwrap();
    while outcome == WaitOutcome::Signaled {
        outcome = cond.wait_until(&mut held, deadline).unwrap();
    }
    assert!(MonotonicInstant::now() >= deadline);
}

#[test]
fn signal_wakes_waiter_on_another_thread() {
    let _guard = acquire_test_guard();
    let shared = Arc::new((NativeMutex::new().unwrap(), NativeCond::new().unwrap()));
    let flag = Arc::new(AtomicBool::new(false));

    let waiter = {
        let shared = Arc::clone(&shared);
        let flag = Arc::clone(&flag);
        thread::spawn(move || {
            let (mutex, cond) = &*shared;
            let mut held = mutex.lock().unwrap();
            let deadline = MonotonicInstant::now().saturating_add(Duration::from_secs(10));
            while !flag.load(Ordering::Acquire) {
                if cond.wait_until(&mut held, deadline).unwrap() == WaitOutcome::TimedOut {
                    return false;
                }
            }
            true
        })
    };

    let (mutex, cond) = &*shared;
    {
        let _held = mutex.lock().unwrap();
        flag.store(true, Ordering::Release);
        cond.broadcast().unwrap();
    }
    assert!(waiter.join().unwrap());
}
