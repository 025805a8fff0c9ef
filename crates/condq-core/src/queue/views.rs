//! Single-ended views over a two-ended queue core.
//!
//! A view owns nothing: every call forwards to the matching `*_front` or
//! `*_back` operation of the core, and all state (size, closed, capacity)
//! lives there. Closing through either view closes the core.

use std::fmt;
use std::marker::PhantomData;

use super::{DequeBase, QueueOpStatus};
use crate::error::PushError;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Front {}
    impl Sealed for super::Back {}
}

/// Selects which end of the core a view pushes to and pulls from.
pub trait QueueEnd: sealed::Sealed {
    fn push<Q: DequeBase + ?Sized>(q: &Q, item: Q::Item) -> Result<(), PushError<Q::Item>>;
    fn pull<Q: DequeBase + ?Sized>(q: &Q) -> Result<Q::Item, QueueOpStatus>;
    fn try_push<Q: DequeBase + ?Sized>(q: &Q, item: Q::Item) -> Result<(), PushError<Q::Item>>;
    fn try_pull<Q: DequeBase + ?Sized>(q: &Q) -> Result<Q::Item, QueueOpStatus>;
    fn nonblocking_push<Q: DequeBase + ?Sized>(
        q: &Q,
        item: Q::Item,
    ) -> Result<(), PushError<Q::Item>>;
    fn nonblocking_pull<Q: DequeBase + ?Sized>(q: &Q) -> Result<Q::Item, QueueOpStatus>;
    fn wait_push<Q: DequeBase + ?Sized>(q: &Q, item: Q::Item) -> Result<(), PushError<Q::Item>>;
    fn wait_pull<Q: DequeBase + ?Sized>(q: &Q) -> Result<Q::Item, QueueOpStatus>;
}

/// The front end.
#[derive(Debug)]
pub enum Front {}

/// The back end.
#[derive(Debug)]
pub enum Back {}

macro_rules! queue_end {
    ($end:ty, $push:ident, $pull:ident, $try_push:ident, $try_pull:ident,
     $nb_push:ident, $nb_pull:ident, $wait_push:ident, $wait_pull:ident) => {
        impl QueueEnd for $end {
            fn push<Q: DequeBase + ?Sized>(q: &Q, item: Q::Item) -> Result<(), PushError<Q::Item>> {
                q.$push(item)
            }
            fn pull<Q: DequeBase + ?Sized>(q: &Q) -> Result<Q::Item, QueueOpStatus> {
                q.$pull()
            }
            fn try_push<Q: DequeBase + ?Sized>(
                q: &Q,
                item: Q::Item,
            ) -> Result<(), PushError<Q::Item>> {
                q.$try_push(item)
            }
            fn try_pull<Q: DequeBase + ?Sized>(q: &Q) -> Result<Q::Item, QueueOpStatus> {
                q.$try_pull()
            }
            fn nonblocking_push<Q: DequeBase + ?Sized>(
                q: &Q,
                item: Q::Item,
            ) -> Result<(), PushError<Q::Item>> {
                q.$nb_push(item)
            }
            fn nonblocking_pull<Q: DequeBase + ?Sized>(q: &Q) -> Result<Q::Item, QueueOpStatus> {
                q.$nb_pull()
            }
            fn wait_push<Q: DequeBase + ?Sized>(
                q: &Q,
                item: Q::Item,
            ) -> Result<(), PushError<Q::Item>> {
                q.$wait_push(item)
            }
            fn wait_pull<Q: DequeBase + ?Sized>(q: &Q) -> Result<Q::Item, QueueOpStatus> {
                q.$wait_pull()
            }
        }
    };
}

queue_end!(
    Front,
    push_front,
    pull_front,
    try_push_front,
    try_pull_front,
    nonblocking_push_front,
    nonblocking_pull_front,
    wait_push_front,
    wait_pull_front
);
queue_end!(
    Back,
    push_back,
    pull_back,
    try_push_back,
    try_pull_back,
    nonblocking_push_back,
    nonblocking_pull_back,
    wait_push_back,
    wait_pull_back
);

/// One end of a shared queue core, under the single-ended vocabulary.
///
/// The borrow keeps the core alive for as long as the view exists.
///
/// ```
/// use condq_core::{DequeBase, SyncDeque, queue};
///
/// let core = SyncDeque::new().unwrap();
/// let (producer, consumer) = (queue::back(&core), queue::front(&core));
/// producer.push(1).unwrap();
/// producer.push(2).unwrap();
/// assert_eq!(consumer.pull(), Ok(1));
/// consumer.close();
/// assert!(producer.closed() && core.closed());
/// ```
pub struct QueueView<'a, Q: ?Sized, E> {
    queue: &'a Q,
    end: PhantomData<fn() -> E>,
}

pub type FrontView<'a, Q> = QueueView<'a, Q, Front>;
pub type BackView<'a, Q> = QueueView<'a, Q, Back>;

#[must_use]
pub fn front<Q: DequeBase + ?Sized>(queue: &Q) -> FrontView<'_, Q> {
    QueueView::new(queue)
}

#[must_use]
pub fn back<Q: DequeBase + ?Sized>(queue: &Q) -> BackView<'_, Q> {
    QueueView::new(queue)
}

impl<'a, Q, E> QueueView<'a, Q, E>
where
    Q: DequeBase + ?Sized,
    E: QueueEnd,
{
    #[must_use]
    pub const fn new(queue: &'a Q) -> Self {
        Self {
            queue,
            end: PhantomData,
        }
    }

    /// The shared core.
    #[must_use]
    pub const fn queue(&self) -> &'a Q {
        self.queue
    }

    /// Blocks while the core is full; refused only once the core is closed.
    pub fn push(&self, item: Q::Item) -> Result<(), PushError<Q::Item>> {
        E::push(self.queue, item)
    }

    /// Blocks while the core is empty and open.
    pub fn pull(&self) -> Result<Q::Item, QueueOpStatus> {
        E::pull(self.queue)
    }

    pub fn try_push(&self, item: Q::Item) -> Result<(), PushError<Q::Item>> {
        E::try_push(self.queue, item)
    }

    pub fn try_pull(&self) -> Result<Q::Item, QueueOpStatus> {
        E::try_pull(self.queue)
    }

    /// Like [`try_push`](Self::try_push), but never waits for the core's lock.
    pub fn nonblocking_push(&self, item: Q::Item) -> Result<(), PushError<Q::Item>> {
        E::nonblocking_push(self.queue, item)
    }

    pub fn nonblocking_pull(&self) -> Result<Q::Item, QueueOpStatus> {
        E::nonblocking_pull(self.queue)
    }

    pub fn wait_push(&self, item: Q::Item) -> Result<(), PushError<Q::Item>> {
        E::wait_push(self.queue, item)
    }

    pub fn wait_pull(&self) -> Result<Q::Item, QueueOpStatus> {
        E::wait_pull(self.queue)
    }

    pub fn empty(&self) -> bool {
        self.queue.empty()
    }

    pub fn full(&self) -> bool {
        self.queue.full()
    }

    pub fn size(&self) -> usize {
        self.queue.size()
    }

    pub fn closed(&self) -> bool {
        self.queue.closed()
    }

    /// Closes the whole core, not just this end.
    pub fn close(&self) {
        self.queue.close();
    }
}

impl<Q: ?Sized, E> Clone for QueueView<'_, Q, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Q: ?Sized, E> Copy for QueueView<'_, Q, E> {}

impl<Q: ?Sized + fmt::Debug, E> fmt::Debug for QueueView<'_, Q, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueView")
            .field("end", &std::any::type_name::<E>())
            .field("queue", &self.queue)
            .finish()
    }
}
