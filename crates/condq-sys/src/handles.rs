//! Handle creation seam and process-wide handle bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::cond::NativeCond;
use crate::error::NativeError;
use crate::mutex::NativeMutex;

// ---------------------------------------------------------------------------
// Handle counters
// ---------------------------------------------------------------------------

static MUTEX_INITS: AtomicU64 = AtomicU64::new(0);
static MUTEX_DESTROYS: AtomicU64 = AtomicU64::new(0);
static COND_INITS: AtomicU64 = AtomicU64::new(0);
static COND_DESTROYS: AtomicU64 = AtomicU64::new(0);
static TEARDOWN_EINTR_RETRIES: AtomicU64 = AtomicU64::new(0);

pub(crate) fn note_mutex_init() {
    MUTEX_INITS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn note_mutex_destroy() {
    MUTEX_DESTROYS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn note_cond_init() {
    COND_INITS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn note_cond_destroy() {
    COND_DESTROYS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn note_teardown_retry() {
    TEARDOWN_EINTR_RETRIES.fetch_add(1, Ordering::Relaxed);
}

/// Snapshot of how many native handles this process created and destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandleCounters {
    pub mutex_inits: u64,
    pub mutex_destroys: u64,
    pub cond_inits: u64,
    pub cond_destroys: u64,
    /// Teardown calls repeated because the OS reported `EINTR`.
    pub teardown_retries: u64,
}

impl HandleCounters {
    #[must_use]
    pub const fn live_mutexes(&self) -> u64 {
        self.mutex_inits.saturating_sub(self.mutex_destroys)
    }

    #[must_use]
    pub const fn live_conds(&self) -> u64 {
        self.cond_inits.saturating_sub(self.cond_destroys)
    }
}

/// Reads the process-wide handle counters.
///
/// Counters are shared by every thread; tests comparing two snapshots must not
/// run concurrently with other handle-creating tests.
#[must_use]
pub fn handle_counters_for_tests() -> HandleCounters {
    HandleCounters {
        mutex_inits: MUTEX_INITS.load(Ordering::Acquire),
        mutex_destroys: MUTEX_DESTROYS.load(Ordering::Acquire),
        cond_inits: COND_INITS.load(Ordering::Acquire),
        cond_destroys: COND_DESTROYS.load(Ordering::Acquire),
        teardown_retries: TEARDOWN_EINTR_RETRIES.load(Ordering::Acquire),
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Creates the native handles a condition primitive is built from.
///
/// The default methods create real OS handles. Overriding one of them is how
/// tests inject an init failure at a chosen step.
pub trait HandleFactory {
    fn create_mutex(&self) -> Result<NativeMutex, NativeError> {
        NativeMutex::new()
    }

    fn create_cond(&self) -> Result<NativeCond, NativeError> {
        NativeCond::new()
    }
}

/// Production factory: plain `pthread_*_init` calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsHandles;

impl HandleFactory for OsHandles {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_counts_never_underflow() {
        let counters = HandleCounters {
            mutex_inits: 1,
            mutex_destroys: 3,
            ..HandleCounters::default()
        };
        assert_eq!(counters.live_mutexes(), 0);
        assert_eq!(counters.live_conds(), 0);
    }

    #[test]
    fn os_factory_creates_both_handles() {
        let mutex = OsHandles.create_mutex().expect("mutex");
        let cond = OsHandles.create_cond().expect("cond");
        drop(cond);
        drop(mutex);
        let after = handle_counters_for_tests();
        assert!(after.mutex_inits >= 1);
        assert!(after.cond_destroys >= 1);
    }
}
