// src/exec/runner.rs

//! Subprocess runner with timeout-based process-group kill.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::exec::operation::{ExecError, OperationState, PendingOperation, SettleCell};

/// Fallback timeout applied when a caller supplies `timeout_ms = 0`.
///
/// This is the only safety net against a hung conversion tool.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// One subprocess invocation: command, verbatim argument vector (never
/// shell-interpreted), and a timeout in milliseconds.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub command: String,
    pub args: Vec<String>,
    /// `0` means "use [`DEFAULT_TIMEOUT_MS`]".
    pub timeout_ms: u64,
}

/// Normalise a caller-supplied timeout: `0` falls back to the default.
pub fn effective_timeout_ms(timeout_ms: u64) -> u64 {
    if timeout_ms == 0 {
        DEFAULT_TIMEOUT_MS
    } else {
        timeout_ms
    }
}

/// Start a subprocess and return a handle to its eventual outcome.
///
/// Returns immediately; the spawned driver task owns the child and settles
/// the operation exactly once when the process exits or the timeout fires,
/// whichever comes first. A single invocation is exactly one subprocess
/// attempt; there are no retries.
pub fn run(spec: RunSpec) -> PendingOperation {
    let (cell, op) = SettleCell::new();
    tokio::spawn(async move {
        drive(spec, cell).await;
    });
    op
}

async fn drive(spec: RunSpec, cell: SettleCell) {
    let timeout_ms = effective_timeout_ms(spec.timeout_ms);
    let timeout_secs = timeout_ms as f64 / 1000.0;

    info!(
        command = %spec.command,
        args = ?spec.args,
        timeout_ms,
        "starting conversion process"
    );

    let mut cmd = Command::new(&spec.command);
    cmd.args(&spec.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group so the timeout can kill the whole tree, not just
    // the immediate child.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            error!(command = %spec.command, error = %err, "failed to spawn process");
            cell.settle(OperationState::Failed(ExecError::Spawn {
                command: spec.command.clone(),
                message: err.to_string(),
            }));
            return;
        }
    };

    let pid = child.id();

    // Accumulate stdout chunks in arrival order, mirroring each to the log.
    // The buffer is only handed over at settlement.
    let stdout = child.stdout.take();
    let stdout_task = tokio::spawn(async move {
        let mut collected = String::new();
        let Some(mut stdout) = stdout else {
            return collected;
        };
        let mut buf = [0u8; 8192];
        loop {
            match stdout.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]);
                    debug!("stdout: {}", chunk.trim_end());
                    collected.push_str(&chunk);
                }
                Err(err) => {
                    warn!(error = %err, "error reading child stdout");
                    break;
                }
            }
        }
        collected
    });

    // Always drain stderr so OS buffers don't fill; log at debug only, it
    // never enters the result.
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("stderr: {}", line);
            }
        });
    }

    // Exactly one of the two arms settles the operation; the losing event
    // source is abandoned, and `SettleCell` guards against a late second
    // settlement regardless.
    tokio::select! {
        status_res = child.wait() => {
            let status = match status_res {
                Ok(status) => status,
                Err(err) => {
                    error!(command = %spec.command, error = %err, "waiting for process failed");
                    cell.settle(OperationState::Failed(ExecError::NonZeroExit { code: -1 }));
                    return;
                }
            };

            // Process exited first: the timer arm never fires. The stdout
            // pipe is at EOF now, so the reader finishes with the full
            // buffer.
            let output = stdout_task.await.unwrap_or_default();

            if status.success() {
                info!(command = %spec.command, "process exited successfully");
                cell.settle(OperationState::Succeeded(output));
            } else {
                let code = status.code().unwrap_or(-1);
                warn!(command = %spec.command, exit_code = code, "process exited with failure");
                cell.settle(OperationState::Failed(ExecError::NonZeroExit { code }));
            }
        }

        _ = sleep(Duration::from_millis(timeout_ms)) => {
            warn!(
                command = %spec.command,
                timeout_ms,
                "process exceeded timeout; killing process group"
            );
            kill_group(&mut child, pid).await;
            // A failed kill is logged above but never masks the timeout
            // failure.
            cell.settle(OperationState::Failed(ExecError::Timeout { secs: timeout_secs }));
        }
    }
}

/// Forcefully kill the child's entire process group.
///
/// On Unix the child was spawned with `process_group(0)`, so its pgid equals
/// its pid and `killpg` takes down everything it spawned.
#[cfg(unix)]
async fn kill_group(child: &mut tokio::process::Child, pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        // Already reaped; nothing left to kill.
        debug!("child has no pid at timeout; skipping group kill");
        return;
    };

    if let Err(err) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        warn!(pid, error = %err, "failed to kill process group");
    }

    // Reap the child so it doesn't linger as a zombie.
    if let Err(err) = child.wait().await {
        debug!(pid, error = %err, "waiting for killed child failed");
    }
}

#[cfg(not(unix))]
async fn kill_group(child: &mut tokio::process::Child, pid: Option<u32>) {
    if let Err(err) = child.kill().await {
        warn!(pid = ?pid, error = %err, "failed to kill child process");
    }
}
