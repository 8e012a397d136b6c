//! Process-wide command tracing.
//!
//! When enabled, every command a store executes and the reply (or error) it
//! produced are written to stderr as `[TRACE]` lines.
//!
//! ```rust
//! use bit_store::trace;
//!
//! trace::enable();
//! assert!(trace::is_enabled());
//! trace::disable();
//! ```

use core::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};

static TRACE_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn enable() {
    TRACE_ENABLED.store(true, Ordering::Release);
}

pub fn disable() {
    TRACE_ENABLED.store(false, Ordering::Release);
}

pub fn is_enabled() -> bool {
    TRACE_ENABLED.load(Ordering::Acquire)
}

pub(crate) fn command(backend: &str, args: &[String]) {
    if is_enabled() {
        eprintln!("[TRACE] {backend} > {}", args.join(" "));
    }
}

pub(crate) fn reply<T: Debug, E: Debug>(backend: &str, result: &Result<T, E>) {
    if is_enabled() {
        match result {
            Ok(value) => eprintln!("[TRACE] {backend} < {value:?}"),
            Err(err) => eprintln!("[TRACE] {backend} ! {err:?}"),
        }
    }
}
