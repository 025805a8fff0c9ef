//! Runtime configuration.
//!
//! Both settings are read from the environment on first use and cached in
//! atomics thereafter:
//! - `CONDQ_POLL_CEILING_MS`: longest single native wait issued on behalf of a
//!   foreign-clock deadline. Default 100, clamped to `1..=60000`.
//! - `CONDQ_LOG`: minimum structured log level (`off` by default; `trace`,
//!   `debug`, `info`, `warn`, `error`, `fatal`).
//!
//! `set_*` overrides take precedence over the environment from then on.

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use crate::log::LogLevel;

pub const POLL_CEILING_ENV: &str = "CONDQ_POLL_CEILING_MS";
pub const LOG_ENV: &str = "CONDQ_LOG";

pub const DEFAULT_POLL_CEILING_MS: u64 = 100;
const MIN_POLL_CEILING_MS: u64 = 1;
const MAX_POLL_CEILING_MS: u64 = 60_000;

// 0 = unresolved; any resolved ceiling is at least 1 ms.
static CACHED_CEILING_MS: AtomicU64 = AtomicU64::new(0);

// 0 = unresolved, 1 = off, 2..=7 = Trace..=Fatal.
static CACHED_LOG: AtomicU8 = AtomicU8::new(0);

const LOG_UNRESOLVED: u8 = 0;
const LOG_OFF: u8 = 1;

fn parse_poll_ceiling_ms(raw: &str) -> u64 {
    raw.trim()
        .parse::<u64>()
        .map_or(DEFAULT_POLL_CEILING_MS, |ms| {
            ms.clamp(MIN_POLL_CEILING_MS, MAX_POLL_CEILING_MS)
        })
}

fn parse_log_env(raw: &str) -> Option<LogLevel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" | "all" => Some(LogLevel::Trace),
        "debug" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warn" | "warning" => Some(LogLevel::Warn),
        "error" => Some(LogLevel::Error),
        "fatal" | "critical" => Some(LogLevel::Fatal),
        _ => None,
    }
}

fn log_to_u8(level: Option<LogLevel>) -> u8 {
    match level {
        None => LOG_OFF,
        Some(LogLevel::Trace) => 2,
        Some(LogLevel::Debug) => 3,
        Some(LogLevel::Info) => 4,
        Some(LogLevel::Warn) => 5,
        Some(LogLevel::Error) => 6,
        Some(LogLevel::Fatal) => 7,
    }
}

fn u8_to_log(v: u8) -> Option<LogLevel> {
    match v {
        2 => Some(LogLevel::Trace),
        3 => Some(LogLevel::Debug),
        4 => Some(LogLevel::Info),
        5 => Some(LogLevel::Warn),
        6 => Some(LogLevel::Error),
        7 => Some(LogLevel::Fatal),
        _ => None,
    }
}

/// Ceiling for one native wait on behalf of a foreign-clock deadline.
#[must_use]
pub fn poll_ceiling() -> Duration {
    let cached = CACHED_CEILING_MS.load(Ordering::Relaxed);
    if cached != 0 {
        return Duration::from_millis(cached);
    }

    let resolved = std::env::var(POLL_CEILING_ENV)
        .map(|raw| parse_poll_ceiling_ms(&raw))
        .unwrap_or(DEFAULT_POLL_CEILING_MS);
    // A concurrent override or resolution wins; both are valid values.
    match CACHED_CEILING_MS.compare_exchange(0, resolved, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => Duration::from_millis(resolved),
        Err(current) => Duration::from_millis(current),
    }
}

/// Overrides the poll ceiling for the rest of the process.
///
/// Rounded down to whole milliseconds and clamped to `1..=60000` ms.
pub fn set_poll_ceiling(ceiling: Duration) {
    let ms = u64::try_from(ceiling.as_millis())
        .unwrap_or(MAX_POLL_CEILING_MS)
        .clamp(MIN_POLL_CEILING_MS, MAX_POLL_CEILING_MS);
    CACHED_CEILING_MS.store(ms, Ordering::Release);
}

/// Minimum level of structured log records, `None` when logging is off.
#[must_use]
pub fn log_level() -> Option<LogLevel> {
    let cached = CACHED_LOG.load(Ordering::Relaxed);
    if cached != LOG_UNRESOLVED {
        return u8_to_log(cached);
    }

    let resolved = std::env::var(LOG_ENV)
        .ok()
        .and_then(|raw| parse_log_env(&raw));
    match CACHED_LOG.compare_exchange(
        LOG_UNRESOLVED,
        log_to_u8(resolved),
        Ordering::AcqRel,
        Ordering::Acquire,
    ) {
        Ok(_) => resolved,
        Err(current) => u8_to_log(current),
    }
}

/// Overrides the structured log level for the rest of the process.
pub fn set_log_level(level: Option<LogLevel>) {
    CACHED_LOG.store(log_to_u8(level), Ordering::Release);
}
