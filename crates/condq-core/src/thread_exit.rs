//! Notification deferred to thread exit.

use std::cell::RefCell;
use std::sync::Arc;

use crate::condvar::{CondLock, Condvar};
use crate::log::{self, LogLevel};

type ExitAction = Box<dyn FnOnce()>;

struct ExitList(RefCell<Vec<ExitAction>>);

impl Drop for ExitList {
    fn drop(&mut self) {
        // Actions run in registration order. One may register another while
        // TLS is being torn down; that one runs immediately instead.
        let actions = std::mem::take(self.0.get_mut());
        for action in actions {
            action();
        }
    }
}

thread_local! {
    static EXIT_ACTIONS: ExitList = const { ExitList(RefCell::new(Vec::new())) };
}

/// Keeps `lock` held until the calling thread exits, then calls
/// [`Condvar::notify_all`] on `cond` and releases `lock`.
///
/// Waiters on `cond` therefore observe the state as the exiting thread left
/// it, after all of that thread's other thread-local values were dropped or
/// while they are being dropped. If the thread is already past the point where
/// it can defer work, the notification happens now.
///
/// Several registrations on one thread run in the order they were made.
pub fn notify_all_at_thread_exit<L>(cond: Arc<Condvar>, lock: L)
where
    L: CondLock + 'static,
{
    let mut action: Option<ExitAction> = Some(Box::new(move || {
        cond.notify_all();
        drop(lock);
        log::record(LogLevel::Debug, "condvar", "condvar.exit_notify", |entry| entry);
    }));

    let registered = EXIT_ACTIONS.try_with(|list| {
        if let Some(action) = action.take() {
            list.0.borrow_mut().push(action);
        }
    });
    if registered.is_err() {
        if let Some(action) = action.take() {
            action();
        }
    }
}
