//! Integration Test: Panic Prohibition
//!
//! **Policy**: Production code propagates errors with `?` or handles them.
//! `unwrap()` and `expect()` are for tests only.

use architectural_enforcement::{report, scan, workspace_root};

#[test]
fn test_no_unwrap_in_production_code() {
    let violations = scan(
        &workspace_root(),
        |code| code.contains(".unwrap()") || code.contains(".expect("),
        |_, _| false,
    );
    report(
        "unwrap()/expect() found in production code!",
        "Return a Result, or use unwrap_or/unwrap_or_else with a fallback.",
        &violations,
    );
}

#[test]
fn test_no_block_on_in_async_code() {
    let violations = scan(
        &workspace_root(),
        |code| code.contains("block_on(") || code.contains("blocking_lock("),
        |_, _| false,
    );
    report(
        "Blocking calls found in async production code!",
        "Await the future instead of blocking the runtime.",
        &violations,
    );
}
