//! # condq-sys
//!
//! Native OS boundary for condq.
//!
//! This crate owns every `unsafe` call the workspace makes: pthread mutex and
//! condition handles pinned on the heap, and the `CLOCK_MONOTONIC` reading the
//! condition handles wait against. Everything above this layer is safe Rust in
//! `condq-core`.
//!
//! # Architecture
//!
//! ```text
//! Condvar (core) -> HandleFactory -> NativeMutex / NativeCond -> libc pthread_*
//!                -> MonotonicInstant -> clock_gettime(CLOCK_MONOTONIC)
//! ```
//!
//! Handle creation reports failure as [`NativeError`]. Failures after creation
//! are returned to the caller, except during teardown where they are fatal.

#![cfg(unix)]

pub mod clock;
pub mod cond;
pub mod error;
pub mod handles;
pub mod mutex;

pub use clock::MonotonicInstant;
pub use cond::{NativeCond, RawCond, WaitOutcome};
pub use error::NativeError;
pub use handles::{HandleCounters, HandleFactory, OsHandles, handle_counters_for_tests};
pub use mutex::{NativeMutex, NativeMutexGuard};
