//! Error types and the fatal-failure path.

use std::fmt;

use condq_sys::NativeError;

use crate::log::{self, LogLevel};
use crate::queue::QueueOpStatus;

/// A primitive could not be constructed.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The OS refused to create a native handle. Nothing half-built survives.
    #[error("{context}: {source}")]
    Resource {
        context: &'static str,
        source: NativeError,
    },
}

impl SyncError {
    /// The native failure underneath.
    #[must_use]
    pub fn native(&self) -> &NativeError {
        match self {
            Self::Resource { source, .. } => source,
        }
    }
}

/// A push was refused; the item is handed back untouched.
#[derive(thiserror::Error)]
#[error("push refused: queue {status}")]
pub struct PushError<T> {
    pub status: QueueOpStatus,
    pub item: T,
}

impl<T> PushError<T> {
    #[must_use]
    pub const fn new(status: QueueOpStatus, item: T) -> Self {
        Self { status, item }
    }

    #[must_use]
    pub fn into_item(self) -> T {
        self.item
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushError")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// A native call failed after successful construction.
///
/// The primitive can no longer be trusted, so this never returns.
#[cold]
pub(crate) fn fatal(component: &'static str, err: NativeError) -> ! {
    log::record(LogLevel::Fatal, component, "condvar.fatal", |entry| {
        entry
            .with_errno(err.code)
            .with_details(serde_json::json!({ "op": err.op }))
    });
    panic!("{component}: {err}");
}
