//! Closable two-ended queue and its single-ended views.
//!
//! [`SyncDeque`] is the shared core; [`FrontView`] and [`BackView`] project it
//! onto one end each, so one view can produce while the other consumes.

use std::fmt;

mod deque;
mod views;

pub use deque::{DequeBase, SyncDeque};
pub use views::{Back, BackView, Front, FrontView, QueueEnd, QueueView, back, front};

/// Outcome of a queue operation.
///
/// Recoverable outcomes are values, not errors: a caller that keeps pushing to
/// a closed queue keeps getting [`Closed`](Self::Closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueOpStatus {
    Success,
    Empty,
    Full,
    Closed,
    /// A no-wait call found the queue's lock held by another thread.
    Busy,
}

impl fmt::Display for QueueOpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Empty => "empty",
            Self::Full => "full",
            Self::Closed => "closed",
            Self::Busy => "busy",
        })
    }
}
