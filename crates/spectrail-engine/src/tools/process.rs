//! Child-process execution with a hard wall-clock timeout.
//!
//! Commands are always spawned from a pre-split argv — never a shell string —
//! with the working directory pinned to the repo root and both streams piped.
//! `kill_on_drop` means a future abandoned at a cancellation point does not
//! leak the child. Timeouts are reported in the result, never retried.

use crate::tools::bound::bound_bytes;
use crate::tools::ToolError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Default subprocess budget. Callers may lower it, never raise it.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-stream capture cap.
pub const STREAM_CAP_BYTES: usize = 100 * 1024;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    fn timed_out() -> Self {
        CommandOutput {
            success: false,
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        }
    }
}

fn cap_stream(bytes: &[u8]) -> String {
    let (clipped, _, _) = bound_bytes(bytes, STREAM_CAP_BYTES);
    String::from_utf8_lossy(&clipped).into_owned()
}

/// Run `argv` with `cwd` as working directory, bounded by `limit`.
/// The caller-provided limit is clamped to the 120 s default.
pub async fn run_argv(
    cwd: &Path,
    argv: &[String],
    limit: Duration,
) -> Result<CommandOutput, ToolError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ToolError::InvalidArgs("empty argv".to_string()))?;
    let limit = limit.min(DEFAULT_COMMAND_TIMEOUT);

    debug!(program, ?args, cwd = %cwd.display(), "spawning command");

    let child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| ToolError::Execution(format!("failed to spawn {program}: {err}")))?;

    // Dropping the wait future on timeout kills the child via kill_on_drop.
    match timeout(limit, child.wait_with_output()).await {
        Err(_) => Ok(CommandOutput::timed_out()),
        Ok(Err(err)) => Err(ToolError::Execution(format!(
            "failed to run {program}: {err}"
        ))),
        Ok(Ok(output)) => Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code().map(i64::from).unwrap_or(-1),
            stdout: cap_stream(&output.stdout),
            stderr: cap_stream(&output.stderr),
            timed_out: false,
        }),
    }
}
