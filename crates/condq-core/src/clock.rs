//! Clock adapter.
//!
//! Native condition handles only understand absolute deadlines on the internal
//! monotonic clock ([`MonotonicInstant`]). Any other clock is foreign: its
//! deadlines are translated relative to "now" at the moment of each native
//! wait, never by assuming the two clocks share an epoch, and each translated
//! wait is capped at the poll ceiling so a clock that jumps is re-read at least
//! that often.

use std::time::{Duration, Instant, SystemTime};

use condq_sys::MonotonicInstant;

/// An absolute time point on some clock.
pub trait TimePoint {
    /// Time left until this point, read from its own clock right now.
    ///
    /// `None` once the point is reached; a zero remainder counts as reached.
    fn remaining(&self) -> Option<Duration>;

    /// `Some` only for points already on the internal clock.
    fn as_internal(&self) -> Option<MonotonicInstant> {
        None
    }
}

fn nonzero(dur: Duration) -> Option<Duration> {
    (!dur.is_zero()).then_some(dur)
}

impl TimePoint for MonotonicInstant {
    fn remaining(&self) -> Option<Duration> {
        nonzero(self.saturating_remaining())
    }

    fn as_internal(&self) -> Option<MonotonicInstant> {
        Some(*self)
    }
}

impl TimePoint for Instant {
    fn remaining(&self) -> Option<Duration> {
        self.checked_duration_since(Instant::now()).and_then(nonzero)
    }
}

impl TimePoint for SystemTime {
    fn remaining(&self) -> Option<Duration> {
        self.duration_since(SystemTime::now()).ok().and_then(nonzero)
    }
}

impl<T: TimePoint + ?Sized> TimePoint for &T {
    fn remaining(&self) -> Option<Duration> {
        (**self).remaining()
    }

    fn as_internal(&self) -> Option<MonotonicInstant> {
        (**self).as_internal()
    }
}

/// Unclamped translation of `deadline` onto the internal clock.
///
/// The internal clock is read before the foreign one, so the result is never
/// later than `now_internal + (deadline - C::now())`. `None` when the deadline
/// has already passed.
#[must_use]
pub fn internal_deadline<T: TimePoint + ?Sized>(deadline: &T) -> Option<MonotonicInstant> {
    if let Some(internal) = deadline.as_internal() {
        return deadline.remaining().map(|_| internal);
    }
    let now = MonotonicInstant::now();
    let remaining = deadline.remaining()?;
    Some(now.saturating_add(remaining))
}

/// Internal deadline for the next native wait on behalf of a foreign deadline.
///
/// Never more than `ceiling` from now. `None` means the deadline has passed
/// and no native wait may be issued.
#[must_use]
pub fn bounded_deadline<T: TimePoint + ?Sized>(
    deadline: &T,
    ceiling: Duration,
) -> Option<MonotonicInstant> {
    let now = MonotonicInstant::now();
    let remaining = deadline.remaining()?;
    Some(now.saturating_add(remaining.min(ceiling)))
}

/// Upper bound on a relative wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// No deadline: only a notification ends the wait.
    Never,
    /// Deadline this long after the call. Zero means poll once.
    After(Duration),
}

impl Timeout {
    /// Internal-clock deadline measured from now; `None` for [`Timeout::Never`]
    /// or when the addition would overflow the clock.
    #[must_use]
    pub fn deadline(self) -> Option<MonotonicInstant> {
        match self {
            Self::Never => None,
            Self::After(dur) => MonotonicInstant::now().checked_add(dur),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(dur: Duration) -> Self {
        Self::After(dur)
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(dur: Option<Duration>) -> Self {
        dur.map_or(Self::Never, Self::After)
    }
}
