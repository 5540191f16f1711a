//! Global notification-level plumbing for the command-line front end.
//!
//! Levels: 0 = silent, 1 = errors, 2 = default notices, 3 = progress,
//! 4 = debug chatter.  Notices go to stderr so piped output stays clean.

use std::sync::atomic::{AtomicI32, Ordering};

static DISPLAY_LEVEL: AtomicI32 = AtomicI32::new(2);

/// Set the global notification level.
pub fn set_display_level(level: i32) {
    DISPLAY_LEVEL.store(level, Ordering::Relaxed);
}

/// Current notification level.
pub fn display_level() -> i32 {
    DISPLAY_LEVEL.load(Ordering::Relaxed)
}

/// Print `msg` to stderr when the global level admits `level`.
pub fn display(level: i32, msg: &str) {
    if level <= display_level() {
        eprint!("{msg}");
    }
}
