//! Process-wide verbosity toggle.
//!
//! Warnings are always emitted through `tracing`. Step-by-step diagnostics
//! (what was scanned, what was resolved, what was invoked) are only emitted
//! at `debug` level while verbosity is on. Off by default.

use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Turn step-by-step diagnostics on or off.
pub fn set_verbose(enabled: bool) {
    VERBOSE.store(enabled, Ordering::Relaxed);
}

/// Whether step-by-step diagnostics are on.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// `tracing::debug!` gated by [`is_verbose`].
macro_rules! verbose {
    ($($arg:tt)*) => {
        if $crate::verbose::is_verbose() {
            ::tracing::debug!($($arg)*);
        }
    };
}

pub(crate) use verbose;
