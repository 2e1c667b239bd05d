//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code must not block a thread with sleeps, and must
//! not poll with timer sleeps. Waiting on I/O, channels and intervals is the
//! way to pass time.
//! **Exception**: a context that lasts a fixed duration (the demo) may sleep
//! for that duration.

use std::path::Path;

use architectural_enforcement::{report, scan, workspace_root};

#[test]
fn test_no_thread_sleep_in_production_code() {
    let violations = scan(
        &workspace_root(),
        |code| code.contains("thread::sleep("),
        |_, _| false,
    );
    report(
        "Blocking sleeps found in production code!",
        "Use tokio timers or wait on the event that matters.",
        &violations,
    );
}

#[test]
fn test_timer_sleeps_only_for_timed_contexts() {
    let violations = scan(
        &workspace_root(),
        |code| code.contains("::sleep(") && !code.contains("thread::sleep("),
        |path: &Path, code| {
            path.ends_with("conductor/core/src/controller.rs") && code.contains("DEMO_DURATION")
        },
    );
    report(
        "Timer sleeps found outside timed contexts!",
        "Use tokio::time::interval() for periodic work, or select! on the event.",
        &violations,
    );
}
