//! The internal monotonic clock.
//!
//! Condition handles created by this crate time their waits against
//! `CLOCK_MONOTONIC`, so this is the only clock whose time points can be
//! handed to a native wait without translation.

use std::time::Duration;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// A reading of `CLOCK_MONOTONIC` with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonotonicInstant {
    since_origin: Duration,
}

impl MonotonicInstant {
    /// Reads the monotonic clock.
    #[must_use]
    pub fn now() -> Self {
        let mut ts = zeroed_timespec();
        // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        assert_eq!(rc, 0, "clock_gettime(CLOCK_MONOTONIC) cannot fail");
        Self::from_timespec(&ts)
    }

    fn from_timespec(ts: &libc::timespec) -> Self {
        let secs = u64::try_from(ts.tv_sec).unwrap_or(0);
        let nanos = u32::try_from(ts.tv_nsec).unwrap_or(0).min(NANOS_PER_SEC - 1);
        Self {
            since_origin: Duration::new(secs, nanos),
        }
    }

    /// Builds an instant from a raw offset since the clock's origin.
    #[must_use]
    pub const fn from_raw(since_origin: Duration) -> Self {
        Self { since_origin }
    }

    /// Offset since the clock's (unspecified) origin.
    #[must_use]
    pub const fn as_raw(&self) -> Duration {
        self.since_origin
    }

    #[must_use]
    pub fn checked_add(&self, dur: Duration) -> Option<Self> {
        self.since_origin.checked_add(dur).map(Self::from_raw)
    }

    #[must_use]
    pub fn saturating_add(&self, dur: Duration) -> Self {
        Self::from_raw(self.since_origin.saturating_add(dur))
    }

    /// `self - earlier`, or `None` when `earlier` is later than `self`.
    #[must_use]
    pub fn checked_duration_since(&self, earlier: Self) -> Option<Duration> {
        self.since_origin.checked_sub(earlier.since_origin)
    }

    #[must_use]
    pub fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.since_origin.saturating_sub(earlier.since_origin)
    }

    /// Time left until `self`, measured now; zero once passed.
    #[must_use]
    pub fn saturating_remaining(&self) -> Duration {
        self.saturating_duration_since(Self::now())
    }

    /// Absolute deadline in the layout `pthread_cond_timedwait` expects.
    #[must_use]
    pub fn to_timespec(&self) -> libc::timespec {
        let mut ts = zeroed_timespec();
        ts.tv_sec = libc::time_t::try_from(self.since_origin.as_secs()).unwrap_or(libc::time_t::MAX);
        ts.tv_nsec = libc::c_long::from(self.since_origin.subsec_nanos() as i32);
        ts
    }
}

// Some targets carry padding fields in `timespec`, so it is never built with a
// struct literal.
fn zeroed_timespec() -> libc::timespec {
    // SAFETY: `timespec` is plain integer fields; all-zero is a valid value.
    unsafe { std::mem::zeroed() }
}
