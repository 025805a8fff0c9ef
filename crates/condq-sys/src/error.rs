//! Errors reported by native pthread calls.

use std::io;

use crate::handles;

/// A pthread call returned a non-zero error number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{op} failed: {}", io::Error::from_raw_os_error(*.code))]
pub struct NativeError {
    /// The native call that failed, e.g. `pthread_cond_init`.
    pub op: &'static str,
    /// Raw errno-style return value.
    pub code: i32,
}

impl NativeError {
    #[must_use]
    pub const fn new(op: &'static str, code: i32) -> Self {
        Self { op, code }
    }

    /// True when the OS refused for lack of memory or another resource.
    #[must_use]
    pub const fn is_resource_exhaustion(&self) -> bool {
        self.code == libc::EAGAIN || self.code == libc::ENOMEM
    }

    /// Maps a pthread return code to `Ok(())` or an error tagged with `op`.
    pub(crate) fn check(op: &'static str, rc: i32) -> Result<(), Self> {
        if rc == 0 { Ok(()) } else { Err(Self::new(op, rc)) }
    }
}

/// Teardown of an initialized handle failed with something other than `EINTR`.
///
/// There is no way to hand the handle back in a consistent state, so this
/// panics, or aborts when the thread is already unwinding.
#[cold]
pub(crate) fn teardown_failed(err: NativeError) -> ! {
    if std::thread::panicking() {
        eprintln!("condq-sys: {err} during unwind; aborting");
        std::process::abort();
    }
    panic!("condq-sys: {err}");
}

/// Runs a destroy call until it stops reporting `EINTR`.
///
/// Each retry is counted in the handle counters. Any other non-zero result is
/// a [`teardown_failed`].
pub(crate) fn destroy_retrying(op: &'static str, mut call: impl FnMut() -> i32) {
    loop {
        match call() {
            0 => return,
            libc::EINTR => handles::note_teardown_retry(),
            code => teardown_failed(NativeError::new(op, code)),
        }
    }
}
