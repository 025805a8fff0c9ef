//! Two-ended queue core.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::{Mutex, MutexGuard};

use super::QueueOpStatus;
use crate::condvar::Condvar;
use crate::error::{PushError, SyncError};
use crate::log::{self, LogLevel};

/// Two-ended operation set of a closable queue.
///
/// Four families per end:
/// - blocking (`push_*`, `pull_*`): wait for space or an item;
/// - `try_*`: one attempt under the lock, never waits for space or items;
/// - `nonblocking_*`: like `try_*`, but also gives up with
///   [`QueueOpStatus::Busy`] instead of waiting for the lock;
/// - `wait_*`: wait, then report the outcome as a status.
///
/// A refused push returns the item inside [`PushError`]. Pulls keep draining
/// a closed queue; [`QueueOpStatus::Closed`] means closed *and* empty.
pub trait DequeBase {
    type Item;

    fn empty(&self) -> bool;
    fn full(&self) -> bool;
    fn size(&self) -> usize;
    fn closed(&self) -> bool;
    /// Closes the queue and wakes every blocked caller. Idempotent.
    fn close(&self);

    fn push_front(&self, item: Self::Item) -> Result<(), PushError<Self::Item>>;
    fn push_back(&self, item: Self::Item) -> Result<(), PushError<Self::Item>>;
    fn pull_front(&self) -> Result<Self::Item, QueueOpStatus>;
    fn pull_back(&self) -> Result<Self::Item, QueueOpStatus>;

    fn try_push_front(&self, item: Self::Item) -> Result<(), PushError<Self::Item>>;
    fn try_push_back(&self, item: Self::Item) -> Result<(), PushError<Self::Item>>;
    fn try_pull_front(&self) -> Result<Self::Item, QueueOpStatus>;
    fn try_pull_back(&self) -> Result<Self::Item, QueueOpStatus>;

    fn nonblocking_push_front(&self, item: Self::Item) -> Result<(), PushError<Self::Item>>;
    fn nonblocking_push_back(&self, item: Self::Item) -> Result<(), PushError<Self::Item>>;
    fn nonblocking_pull_front(&self) -> Result<Self::Item, QueueOpStatus>;
    fn nonblocking_pull_back(&self) -> Result<Self::Item, QueueOpStatus>;

    fn wait_push_front(&self, item: Self::Item) -> Result<(), PushError<Self::Item>>;
    fn wait_push_back(&self, item: Self::Item) -> Result<(), PushError<Self::Item>>;
    fn wait_pull_front(&self) -> Result<Self::Item, QueueOpStatus>;
    fn wait_pull_back(&self) -> Result<Self::Item, QueueOpStatus>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Front,
    Back,
}

struct DequeState<T> {
    items: VecDeque<T>,
    capacity: Option<usize>,
    closed: bool,
    blocked: u64,
}

impl<T> DequeState<T> {
    fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.items.len() >= cap)
    }

    fn push(&mut self, side: Side, item: T) -> Result<(), PushError<T>> {
        if self.closed {
            return Err(PushError::new(QueueOpStatus::Closed, item));
        }
        if self.is_full() {
            return Err(PushError::new(QueueOpStatus::Full, item));
        }
        match side {
            Side::Front => self.items.push_front(item),
            Side::Back => self.items.push_back(item),
        }
        Ok(())
    }

    fn pull(&mut self, side: Side) -> Result<T, QueueOpStatus> {
        let item = match side {
            Side::Front => self.items.pop_front(),
            Side::Back => self.items.pop_back(),
        };
        item.ok_or(if self.closed {
            QueueOpStatus::Closed
        } else {
            QueueOpStatus::Empty
        })
    }
}

/// Closable two-ended blocking queue, optionally bounded.
///
/// Producers blocked on a full queue wait on one condition, consumers blocked
/// on an empty one on another; [`close`](DequeBase::close) releases both.
pub struct SyncDeque<T> {
    state: Mutex<DequeState<T>>,
    // Fixed at construction; read without the state lock.
    capacity: Option<usize>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> SyncDeque<T> {
    /// Unbounded queue.
    pub fn new() -> Result<Self, SyncError> {
        Self::build(None)
    }

    /// Queue holding at most `capacity` items; a capacity of 0 is raised to 1.
    pub fn with_capacity(capacity: usize) -> Result<Self, SyncError> {
        Self::build(Some(capacity.max(1)))
    }

    fn build(capacity: Option<usize>) -> Result<Self, SyncError> {
        Ok(Self {
            state: Mutex::new(DequeState {
                items: capacity.map_or_else(VecDeque::new, VecDeque::with_capacity),
                capacity,
                closed: false,
                blocked: 0,
            }),
            capacity,
            not_empty: Condvar::new()?,
            not_full: Condvar::new()?,
        })
    }

    #[must_use]
    pub const fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn pushed(&self, result: Result<(), PushError<T>>) -> Result<(), PushError<T>> {
        if result.is_ok() {
            self.not_empty.notify_one();
        }
        result
    }

    fn pulled(&self, result: Result<T, QueueOpStatus>) -> Result<T, QueueOpStatus> {
        if result.is_ok() {
            self.not_full.notify_one();
        }
        result
    }

    fn try_push(&self, side: Side, item: T) -> Result<(), PushError<T>> {
        let result = self.state.lock().push(side, item);
        self.pushed(result)
    }

    fn try_pull(&self, side: Side) -> Result<T, QueueOpStatus> {
        let result = self.state.lock().pull(side);
        self.pulled(result)
    }

    fn nonblocking_push(&self, side: Side, item: T) -> Result<(), PushError<T>> {
        let Some(mut state) = self.state.try_lock() else {
            return Err(PushError::new(QueueOpStatus::Busy, item));
        };
        let result = state.push(side, item);
        drop(state);
        self.pushed(result)
    }

    fn nonblocking_pull(&self, side: Side) -> Result<T, QueueOpStatus> {
        let Some(mut state) = self.state.try_lock() else {
            return Err(QueueOpStatus::Busy);
        };
        let result = state.pull(side);
        drop(state);
        self.pulled(result)
    }

    fn wait_push(&self, side: Side, item: T) -> Result<(), PushError<T>> {
        let mut state = self.state.lock();
        if state.is_full() && !state.closed {
            Self::block(&self.not_full, &mut state, |s| s.closed || !s.is_full());
        }
        let result = state.push(side, item);
        drop(state);
        self.pushed(result)
    }

    fn wait_pull(&self, side: Side) -> Result<T, QueueOpStatus> {
        let mut state = self.state.lock();
        if state.items.is_empty() && !state.closed {
            Self::block(&self.not_empty, &mut state, |s| s.closed || !s.items.is_empty());
        }
        let result = state.pull(side);
        drop(state);
        self.pulled(result)
    }

    fn block(
        cond: &Condvar,
        state: &mut MutexGuard<'_, DequeState<T>>,
        ready: impl FnMut(&mut DequeState<T>) -> bool,
    ) {
        state.blocked += 1;
        cond.wait_pred(state, ready);
        state.blocked -= 1;
    }
}

impl<T> DequeBase for SyncDeque<T> {
    type Item = T;

    fn empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    fn full(&self) -> bool {
        self.state.lock().is_full()
    }

    fn size(&self) -> usize {
        self.state.lock().items.len()
    }

    fn closed(&self) -> bool {
        self.state.lock().closed
    }

    fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let (blocked, size) = (state.blocked, state.items.len());
        drop(state);

        self.not_empty.notify_all();
        self.not_full.notify_all();
        log::record(LogLevel::Debug, "queue", "queue.close", |entry| {
            entry
                .with_waiters(blocked)
                .with_details(serde_json::json!({ "size": size }))
        });
    }

    fn push_front(&self, item: T) -> Result<(), PushError<T>> {
        self.wait_push(Side::Front, item)
    }

    fn push_back(&self, item: T) -> Result<(), PushError<T>> {
        self.wait_push(Side::Back, item)
    }

    fn pull_front(&self) -> Result<T, QueueOpStatus> {
        self.wait_pull(Side::Front)
    }

    fn pull_back(&self) -> Result<T, QueueOpStatus> {
        self.wait_pull(Side::Back)
    }

    fn try_push_front(&self, item: T) -> Result<(), PushError<T>> {
        self.try_push(Side::Front, item)
    }

    fn try_push_back(&self, item: T) -> Result<(), PushError<T>> {
        self.try_push(Side::Back, item)
    }

    fn try_pull_front(&self) -> Result<T, QueueOpStatus> {
        self.try_pull(Side::Front)
    }

    fn try_pull_back(&self) -> Result<T, QueueOpStatus> {
        self.try_pull(Side::Back)
    }

    fn nonblocking_push_front(&self, item: T) -> Result<(), PushError<T>> {
        self.nonblocking_push(Side::Front, item)
    }

    fn nonblocking_push_back(&self, item: T) -> Result<(), PushError<T>> {
        self.nonblocking_push(Side::Back, item)
    }

    fn nonblocking_pull_front(&self) -> Result<T, QueueOpStatus> {
        self.nonblocking_pull(Side::Front)
    }

    fn nonblocking_pull_back(&self) -> Result<T, QueueOpStatus> {
        self.nonblocking_pull(Side::Back)
    }

    fn wait_push_front(&self, item: T) -> Result<(), PushError<T>> {
        self.wait_push(Side::Front, item)
    }

    fn wait_push_back(&self, item: T) -> Result<(), PushError<T>> {
        self.wait_push(Side::Back, item)
    }

    fn wait_pull_front(&self) -> Result<T, QueueOpStatus> {
        self.wait_pull(Side::Front)
    }

    fn wait_pull_back(&self) -> Result<T, QueueOpStatus> {
        self.wait_pull(Side::Back)
    }
}

impl<T> fmt::Debug for SyncDeque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SyncDeque")
            .field("size", &state.items.len())
            .field("capacity", &self.capacity)
            .field("closed", &state.closed)
            .finish_non_exhaustive()
    }
}
