//! Owned `pthread_mutex_t`.
//!
//! The handle lives in its own heap allocation so its address never changes
//! after `pthread_mutex_init`, even when the owning value is moved.

use std::cell::UnsafeCell;
use std::marker::PhantomData;

use crate::error::{NativeError, destroy_retrying, teardown_failed};
use crate::handles;

/// A native mutex handle. Not clonable; destroyed on drop.
pub struct NativeMutex {
    raw: Box<UnsafeCell<libc::pthread_mutex_t>>,
}

// SAFETY: pthread mutexes are designed to be shared and locked from any thread;
// the boxed handle is never moved after init.
unsafe impl Send for NativeMutex {}
// SAFETY: see above; every access goes through pthread calls.
unsafe impl Sync for NativeMutex {}

impl NativeMutex {
    /// Initializes a default (non-recursive, process-private) mutex.
    pub fn new() -> Result<Self, NativeError> {
        let raw = Box::new(UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER));
        // SAFETY: `raw` is a freshly allocated, properly aligned handle that is
        // not yet shared with any other thread.
        let rc = unsafe { libc::pthread_mutex_init(raw.get(), std::ptr::null()) };
        NativeError::check("pthread_mutex_init", rc)?;
        handles::note_mutex_init();
        Ok(Self { raw })
    }

    /// Blocks until the mutex is acquired.
    pub fn lock(&self) -> Result<NativeMutexGuard<'_>, NativeError> {
        // SAFETY: the handle was initialized in `new` and is destroyed only in drop.
        let rc = unsafe { libc::pthread_mutex_lock(self.raw.get()) };
        NativeError::check("pthread_mutex_lock", rc)?;
        Ok(NativeMutexGuard {
            mutex: self,
            _not_send: PhantomData,
        })
    }

    /// Raw handle, valid for the lifetime of `self`.
    #[must_use]
    pub fn as_raw(&self) -> *mut libc::pthread_mutex_t {
        self.raw.get()
    }
}

impl Drop for NativeMutex {
    fn drop(&mut self) {
        let raw = self.raw.get();
        destroy_retrying("pthread_mutex_destroy", || {
            // SAFETY: `&mut self` proves no guard borrows the mutex, so it is
            // initialized and unlocked.
            unsafe { libc::pthread_mutex_destroy(raw) }
        });
        handles::note_mutex_destroy();
    }
}

impl std::fmt::Debug for NativeMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeMutex")
            .field("handle", &self.raw.get())
            .finish()
    }
}

/// Proof that the calling thread holds a [`NativeMutex`]. Unlocks on drop.
///
/// Must be released on the thread that acquired it.
pub struct NativeMutexGuard<'a> {
    mutex: &'a NativeMutex,
    _not_send: PhantomData<*const ()>,
}

impl NativeMutexGuard<'_> {
    /// The mutex this guard holds.
    #[must_use]
    pub fn mutex(&self) -> &NativeMutex {
        self.mutex
    }
}

impl Drop for NativeMutexGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: this guard is the proof that the current thread locked it.
        let rc = unsafe { libc::pthread_mutex_unlock(self.mutex.as_raw()) };
        if rc != 0 {
            teardown_failed(NativeError::new("pthread_mutex_unlock", rc));
        }
    }
}
