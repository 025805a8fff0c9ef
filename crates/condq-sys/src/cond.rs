//! Owned `pthread_cond_t` timed against `CLOCK_MONOTONIC`.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

use crate::clock::MonotonicInstant;
use crate::error::{NativeError, destroy_retrying};
use crate::handles;
use crate::mutex::NativeMutexGuard;

/// The platform condition handle type.
pub type RawCond = libc::pthread_cond_t;

/// Result of one native timed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Woken before the deadline. May be spurious.
    Signaled,
    /// The deadline passed.
    TimedOut,
}

/// A native condition handle. Not clonable; destroyed on drop.
pub struct NativeCond {
    raw: Box<UnsafeCell<libc::pthread_cond_t>>,
}

// SAFETY: pthread condition variables are designed for cross-thread use; the
// boxed handle is never moved after init.
unsafe impl Send for NativeCond {}
// SAFETY: see above; every access goes through pthread calls.
unsafe impl Sync for NativeCond {}

impl NativeCond {
    /// Initializes a condition handle whose timed waits use `CLOCK_MONOTONIC`.
    pub fn new() -> Result<Self, NativeError> {
        let raw = Box::new(UnsafeCell::new(libc::PTHREAD_COND_INITIALIZER));
        // SAFETY: `raw` is freshly allocated and not shared yet.
        unsafe { init_monotonic(raw.get())? };
        handles::note_cond_init();
        Ok(Self { raw })
    }

    /// Atomically releases `guard`'s mutex and blocks until woken.
    ///
    /// The mutex is held again on return. Wakeups may be spurious.
    pub fn wait(&self, guard: &mut NativeMutexGuard<'_>) -> Result<(), NativeError> {
        // SAFETY: both handles are initialized; `guard` proves the calling
        // thread holds the mutex, as pthread_cond_wait requires.
        let rc = unsafe { libc::pthread_cond_wait(self.raw.get(), guard.mutex().as_raw()) };
        NativeError::check("pthread_cond_wait", rc)
    }

    /// Like [`wait`](Self::wait), but gives up once `deadline` passes.
    pub fn wait_until(
        &self,
        guard: &mut NativeMutexGuard<'_>,
        deadline: MonotonicInstant,
    ) -> Result<WaitOutcome, NativeError> {
        // SAFETY: same contract as `wait`.
        let rc = unsafe { timed_wait(self.raw.get(), guard.mutex().as_raw(), deadline) };
        match rc {
            0 | libc::EINTR => Ok(WaitOutcome::Signaled),
            libc::ETIMEDOUT => Ok(WaitOutcome::TimedOut),
            code => Err(NativeError::new("pthread_cond_timedwait", code)),
        }
    }

    /// Wakes at most one waiter.
    pub fn signal(&self) -> Result<(), NativeError> {
        // SAFETY: the handle is initialized.
        let rc = unsafe { libc::pthread_cond_signal(self.raw.get()) };
        NativeError::check("pthread_cond_signal", rc)
    }

    /// Wakes every waiter.
    pub fn broadcast(&self) -> Result<(), NativeError> {
        // SAFETY: the handle is initialized.
        let rc = unsafe { libc::pthread_cond_broadcast(self.raw.get()) };
        NativeError::check("pthread_cond_broadcast", rc)
    }

    /// Raw handle, valid for the lifetime of `self`.
    #[must_use]
    pub fn as_raw(&self) -> *mut RawCond {
        self.raw.get()
    }
}

impl Drop for NativeCond {
    fn drop(&mut self) {
        let raw = self.raw.get();
        destroy_retrying("pthread_cond_destroy", || {
            // SAFETY: `&mut self` means no thread can be inside a wait call on it.
            unsafe { libc::pthread_cond_destroy(raw) }
        });
        handles::note_cond_destroy();
    }
}

impl std::fmt::Debug for NativeCond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeCond")
            .field("handle", &self.raw.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Platform glue
// ---------------------------------------------------------------------------

#[cfg(not(target_vendor = "apple"))]
unsafe fn init_monotonic(cond: *mut libc::pthread_cond_t) -> Result<(), NativeError> {
    let mut attr = MaybeUninit::<libc::pthread_condattr_t>::uninit();
    // SAFETY: `attr` is writable storage for the attribute object.
    let rc = unsafe { libc::pthread_condattr_init(attr.as_mut_ptr()) };
    NativeError::check("pthread_condattr_init", rc)?;

    // SAFETY: `attr` was initialized above.
    let rc = unsafe { libc::pthread_condattr_setclock(attr.as_mut_ptr(), libc::CLOCK_MONOTONIC) };
    if rc != 0 {
        // SAFETY: `attr` is initialized and destroyed exactly once.
        unsafe { libc::pthread_condattr_destroy(attr.as_mut_ptr()) };
        return Err(NativeError::new("pthread_condattr_setclock", rc));
    }

    // SAFETY: caller guarantees `cond` is unshared storage; `attr` is initialized.
    let rc = unsafe { libc::pthread_cond_init(cond, attr.as_ptr()) };
    // SAFETY: the attribute object is no longer needed once init returns.
    unsafe { libc::pthread_condattr_destroy(attr.as_mut_ptr()) };
    NativeError::check("pthread_cond_init", rc)
}

#[cfg(not(target_vendor = "apple"))]
unsafe fn timed_wait(
    cond: *mut libc::pthread_cond_t,
    mutex: *mut libc::pthread_mutex_t,
    deadline: MonotonicInstant,
) -> i32 {
    let ts = deadline.to_timespec();
    // SAFETY: forwarded from the caller.
    unsafe { libc::pthread_cond_timedwait(cond, mutex, &ts) }
}

// Apple has no pthread_condattr_setclock; the monotonic deadline is turned into
// a relative wait instead.
#[cfg(target_vendor = "apple")]
unsafe fn init_monotonic(cond: *mut libc::pthread_cond_t) -> Result<(), NativeError> {
    // SAFETY: caller guarantees `cond` is unshared storage.
    let rc = unsafe { libc::pthread_cond_init(cond, std::ptr::null()) };
    NativeError::check("pthread_cond_init", rc)
}

#[cfg(target_vendor = "apple")]
unsafe fn timed_wait(
    cond: *mut libc::pthread_cond_t,
    mutex: *mut libc::pthread_mutex_t,
    deadline: MonotonicInstant,
) -> i32 {
    let remaining = deadline.saturating_remaining();
    if remaining.is_zero() {
        return libc::ETIMEDOUT;
    }
    let ts = MonotonicInstant::from_raw(remaining).to_timespec();
    // SAFETY: forwarded from the caller.
    unsafe { libc::pthread_cond_timedwait_relative_np(cond, mutex, &ts) }
}
