//! Predicate-aware condition variable.
//!
//! [`Condvar`] owns one native mutex and one native condition handle. The
//! native mutex guards only the condition handle's own bookkeeping; the state
//! callers wait on is protected by *their* lock, any [`CondLock`].
//!
//! Wait protocol:
//! 1. take the internal mutex while the caller's lock is still held;
//! 2. release the caller's lock;
//! 3. native wait on the internal mutex;
//! 4. release the internal mutex, then reacquire the caller's lock.
//!
//! Notifiers take the internal mutex before signalling. A notify issued after a
//! state change made under the caller's lock therefore reaches the waiter, since
//! the waiter held the internal mutex from before it released the caller's lock
//! until it was parked in the native wait.

use std::fmt;
use std::ops::DerefMut;

use condq_sys::{
    HandleFactory, MonotonicInstant, NativeCond, NativeError, NativeMutex, NativeMutexGuard,
    OsHandles, RawCond, WaitOutcome,
};
use parking_lot::lock_api::{ArcMutexGuard, MutexGuard, RawMutex};

use crate::clock::{self, TimePoint, Timeout};
use crate::config;
use crate::error::{SyncError, fatal};
use crate::log::{self, LogLevel};

const COMPONENT: &str = "condvar";

/// A held lock that can be released around a closure and taken back.
///
/// Implemented for every `lock_api` mutex guard, which covers all
/// `parking_lot` mutexes.
pub trait CondLock: DerefMut {
    /// Releases the lock, runs `f`, and reacquires the lock, also when `f`
    /// unwinds.
    fn unlocked<U>(&mut self, f: impl FnOnce() -> U) -> U;
}

impl<'a, R: RawMutex + 'a, T: ?Sized + 'a> CondLock for MutexGuard<'a, R, T> {
    fn unlocked<U>(&mut self, f: impl FnOnce() -> U) -> U {
        MutexGuard::unlocked(self, f)
    }
}

impl<R: RawMutex, T: ?Sized> CondLock for ArcMutexGuard<R, T> {
    fn unlocked<U>(&mut self, f: impl FnOnce() -> U) -> U {
        ArcMutexGuard::unlocked(self, f)
    }
}

/// Whether a timed wait ended because its deadline passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CvStatus {
    /// Woken before the deadline. The awaited condition may still be false.
    NoTimeout,
    /// The deadline passed without a wakeup being observed.
    Timeout,
}

impl CvStatus {
    #[must_use]
    pub const fn timed_out(self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// A condition variable usable with any [`CondLock`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use condq_core::Condvar;
/// use parking_lot::Mutex;
///
/// let shared = Arc::new((Mutex::new(false), Condvar::new().unwrap()));
/// let producer = Arc::clone(&shared);
/// std::thread::spawn(move || {
///     let (ready, cv) = &*producer;
///     *ready.lock() = true;
///     cv.notify_one();
/// });
///
/// let (ready, cv) = &*shared;
/// let mut guard = ready.lock();
/// assert!(cv.wait_for_pred(&mut guard, Duration::from_secs(10), |ready| *ready));
/// ```
pub struct Condvar {
    internal: NativeMutex,
    cond: NativeCond,
}

impl Condvar {
    /// Creates a condition variable backed by fresh OS handles.
    pub fn new() -> Result<Self, SyncError> {
        Self::with_handles(&OsHandles)
    }

    /// Creates a condition variable from handles made by `handles`.
    ///
    /// If the condition handle cannot be created, the already created mutex
    /// handle is destroyed before the error is returned.
    pub fn with_handles<H: HandleFactory + ?Sized>(handles: &H) -> Result<Self, SyncError> {
        let internal = handles
            .create_mutex()
            .map_err(|source| init_failed("condvar internal mutex", source))?;
        // `internal` is dropped, and its handle destroyed, if this fails.
        let cond = handles
            .create_cond()
            .map_err(|source| init_failed("condvar condition handle", source))?;
        Ok(Self { internal, cond })
    }

    /// Releases `lock`, blocks until woken, and reacquires `lock`.
    ///
    /// Wakeups may be spurious; re-check the awaited condition or use
    /// [`wait_pred`](Self::wait_pred).
    pub fn wait<L: CondLock>(&self, lock: &mut L) {
        let mut internal = self.lock_internal();
        lock.unlocked(move || {
            if let Err(err) = self.cond.wait(&mut internal) {
                fatal(COMPONENT, err);
            }
            drop(internal);
        });
    }

    /// Waits until `pred` holds. `pred` only ever runs with `lock` held.
    pub fn wait_pred<L, P>(&self, lock: &mut L, mut pred: P)
    where
        L: CondLock,
        P: FnMut(&mut L::Target) -> bool,
    {
        while !pred(&mut **lock) {
            self.wait(lock);
        }
    }

    /// Waits until woken or until `deadline`, which may be on any clock.
    ///
    /// Internal-clock deadlines go to the native wait as-is. Foreign deadlines
    /// are re-translated before every native wait, and no single native wait
    /// exceeds [`config::poll_ceiling`]. A deadline that has already passed
    /// returns [`CvStatus::Timeout`] without waiting.
    pub fn wait_until<L: CondLock, T: TimePoint>(&self, lock: &mut L, deadline: T) -> CvStatus {
        if let Some(internal) = deadline.as_internal() {
            if deadline.remaining().is_none() {
                return timed_out();
            }
            return match self.wait_native_until(lock, internal) {
                WaitOutcome::Signaled => CvStatus::NoTimeout,
                WaitOutcome::TimedOut => timed_out(),
            };
        }

        let ceiling = config::poll_ceiling();
        loop {
            let Some(bounded) = clock::bounded_deadline(&deadline, ceiling) else {
                return timed_out();
            };
            if self.wait_native_until(lock, bounded) == WaitOutcome::Signaled {
                return CvStatus::NoTimeout;
            }
            log::record(LogLevel::Trace, COMPONENT, "condvar.repoll", |entry| {
                let entry = entry.with_ceiling(ceiling);
                match deadline.remaining() {
                    Some(left) => entry.with_remaining(left),
                    None => entry,
                }
            });
        }
    }

    /// Waits until `pred` holds or `deadline` passes.
    ///
    /// Returns `pred`'s value at the deadline when time runs out, so a
    /// condition that became true right at the deadline still reports `true`.
    pub fn wait_until_pred<L, T, P>(&self, lock: &mut L, deadline: T, mut pred: P) -> bool
    where
        L: CondLock,
        T: TimePoint,
        P: FnMut(&mut L::Target) -> bool,
    {
        while !pred(&mut **lock) {
            if self.wait_until(lock, &deadline).timed_out() {
                return pred(&mut **lock);
            }
        }
        true
    }

    /// Waits until woken or `timeout` elapses on the internal clock.
    ///
    /// [`Timeout::Never`] (or a duration too large to represent) waits without
    /// a deadline; a zero duration only checks the deadline.
    pub fn wait_for<L: CondLock>(&self, lock: &mut L, timeout: impl Into<Timeout>) -> CvStatus {
        match timeout.into().deadline() {
            Some(deadline) => self.wait_until(lock, deadline),
            None => {
                self.wait(lock);
                CvStatus::NoTimeout
            }
        }
    }

    /// Waits until `pred` holds or `timeout` elapses; `pred` is evaluated at
    /// least once, even for a zero timeout.
    pub fn wait_for_pred<L, P>(&self, lock: &mut L, timeout: impl Into<Timeout>, pred: P) -> bool
    where
        L: CondLock,
        P: FnMut(&mut L::Target) -> bool,
    {
        match timeout.into().deadline() {
            Some(deadline) => self.wait_until_pred(lock, deadline, pred),
            None => {
                self.wait_pred(lock, pred);
                true
            }
        }
    }

    /// Wakes at most one waiter. The caller's lock need not be held.
    pub fn notify_one(&self) {
        let _internal = self.lock_internal();
        if let Err(err) = self.cond.signal() {
            fatal(COMPONENT, err);
        }
    }

    /// Wakes every current waiter. The caller's lock need not be held.
    pub fn notify_all(&self) {
        let _internal = self.lock_internal();
        if let Err(err) = self.cond.broadcast() {
            fatal(COMPONENT, err);
        }
    }

    /// The underlying `pthread_cond_t`, valid while `self` lives.
    #[must_use]
    pub fn native_handle(&self) -> *mut RawCond {
        self.cond.as_raw()
    }

    fn lock_internal(&self) -> NativeMutexGuard<'_> {
        self.internal
            .lock()
            .unwrap_or_else(|err| fatal(COMPONENT, err))
    }

    fn wait_native_until<L: CondLock>(&self, lock: &mut L, deadline: MonotonicInstant) -> WaitOutcome {
        let mut internal = self.lock_internal();
        lock.unlocked(move || {
            let outcome = self
                .cond
                .wait_until(&mut internal, deadline)
                .unwrap_or_else(|err| fatal(COMPONENT, err));
            drop(internal);
            outcome
        })
    }
}

impl fmt::Debug for Condvar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condvar")
            .field("cond", &self.cond)
            .finish_non_exhaustive()
    }
}

fn timed_out() -> CvStatus {
    log::record(LogLevel::Debug, COMPONENT, "condvar.timeout", |entry| entry);
    CvStatus::Timeout
}

fn init_failed(context: &'static str, source: NativeError) -> SyncError {
    log::record(LogLevel::Error, COMPONENT, "condvar.init_failed", |entry| {
        entry
            .with_errno(source.code)
            .with_details(serde_json::json!({ "op": source.op, "context": context }))
    });
    SyncError::Resource { context, source }
}
