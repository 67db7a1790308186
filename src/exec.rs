// Bounded external command execution

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::collectors::SourceOutcome;

/// Cap on how much of a tool's stderr is carried in a failure reason.
const REASON_CHAR_LIMIT: usize = 200;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Run one vendor tool with a hard wall-clock bound. A missing binary or a
/// timeout is `Unavailable`; a non-zero exit is `Failed` with a truncated
/// reason. The child is killed if the bound elapses.
pub async fn run_bounded(program: &str, args: &[&str], timeout: Duration) -> SourceOutcome<String> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Polling tools from a background loop must not flash console windows.
    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(program, "tool not installed");
            return SourceOutcome::Unavailable;
        }
        Err(e) => return SourceOutcome::Failed(format!("{}: spawn: {}", program, e)),
    };

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return SourceOutcome::Failed(format!("{}: {}", program, e)),
        Err(_) => {
            debug!(program, timeout_secs = timeout.as_secs(), "tool timed out");
            return SourceOutcome::Unavailable;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut reason: String = stderr.trim().chars().take(REASON_CHAR_LIMIT).collect();
        if reason.is_empty() {
            reason = format!("exit status {}", output.status);
        }
        return SourceOutcome::Failed(format!("{}: {}", program, reason));
    }

    SourceOutcome::Yielded(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_tool_is_unavailable() {
        let out = run_bounded("hwsnap-no-such-tool", &[], Duration::from_secs(1)).await;
        assert_eq!(out, SourceOutcome::Unavailable);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_failed_with_reason() {
        let out = run_bounded("sh", &["-c", "echo boom >&2; exit 3"], Duration::from_secs(5)).await;
        match out {
            SourceOutcome::Failed(reason) => assert!(reason.contains("boom")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_is_unavailable() {
        let out = run_bounded("sleep", &["5"], Duration::from_millis(100)).await;
        assert_eq!(out, SourceOutcome::Unavailable);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_is_yielded() {
        let out = run_bounded("sh", &["-c", "echo hello"], Duration::from_secs(5)).await;
        assert_eq!(out, SourceOutcome::Yielded("hello\n".into()));
    }
}
