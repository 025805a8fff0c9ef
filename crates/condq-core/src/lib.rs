//! # condq-core
//!
//! Portable waiting primitives built on the native handles of `condq-sys`:
//!
//! - [`Condvar`]: a predicate-aware condition variable that waits on any
//!   [`CondLock`] (every `parking_lot` mutex guard), translates deadlines from
//!   foreign clocks into bounded waits on the internal monotonic clock, and
//!   re-checks predicates after every wakeup.
//! - [`SyncDeque`]: a closable two-ended blocking queue, and [`QueueView`], the
//!   single-ended front/back projections over it.
//!
//! No `unsafe` code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod clock;
pub mod condvar;
pub mod config;
pub mod error;
pub mod log;
pub mod queue;
pub mod thread_exit;

pub use clock::{TimePoint, Timeout};
pub use condvar::{CondLock, Condvar, CvStatus};
pub use error::{PushError, SyncError};
pub use queue::{
    Back, BackView, DequeBase, Front, FrontView, QueueEnd, QueueOpStatus, QueueView, SyncDeque,
};
pub use thread_exit::notify_all_at_thread_exit;

pub use condq_sys::MonotonicInstant;
