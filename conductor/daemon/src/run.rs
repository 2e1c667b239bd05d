//! Child process wrapper

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::info;

use nyan_core::{ProgressApi, ProgressOptions};

/// Progress options for running `program`
pub fn options_for(program: &str) -> ProgressOptions {
    ProgressOptions::titled(format!("Task: {program}"))
        .with_auto_reveal(true)
        .with_completion_message(format!("Task finished: {program}"))
}

/// Run `program` inside a progress context and return its exit code
///
/// A child killed by a signal reports exit code 1.
pub async fn run(api: &ProgressApi, program: &str, args: &[String]) -> Result<i32> {
    let mut child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("Failed to start {program}"))?;

    let status = api
        .with_progress(options_for(program), child.wait())
        .await?
        .with_context(|| format!("Failed to wait for {program}"))?;

    info!(program, status = %status, "Child exited");
    Ok(status.code().unwrap_or(1))
}
