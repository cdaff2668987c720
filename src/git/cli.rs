//! git::cli
//!
//! Async runner for the `git` executable, used only for network operations.
//!
//! Push, fetch and pull go through the CLI so that the user's own
//! credential helpers, SSH agent and transport configuration apply
//! unchanged. Everything else uses git2.
//!
//! # Invariants
//!
//! - Git never prompts: `GIT_TERMINAL_PROMPT=0` and SSH runs in batch mode
//!   unless the caller configured `GIT_SSH_COMMAND` themselves
//! - Every invocation is bounded by the configured timeout
//! - A cancelled or timed-out invocation kills the child process
//! - Failures are classified so callers can tell authentication problems,
//!   rejected pushes and unreachable remotes apart

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitCliError {
    #[error("git executable not found or not runnable")]
    NotAvailable,
    #[error("git command failed: {0}")]
    CommandFailed(String),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("push rejected: {0}")]
    PushRejected(String),
    /// The remote refused the update itself (hooks, protected branches).
    #[error("push declined by the remote: {0}")]
    RemoteDeclined(String),
    #[error("remote unreachable: {0}")]
    Unreachable(String),
    /// Carries the missing ref name
    #[error("remote ref not found: {0}")]
    RemoteRefNotFound(String),
    #[error("git timed out after {}s", .0.as_secs())]
    TimedOut(Duration),
    #[error("cancelled")]
    Cancelled,
    /// `pull --rebase` stopped on conflicts; the rebase was aborted.
    #[error("rebase conflict in: {}", .0.join(", "))]
    RebaseConflict(Vec<String>),
}

/// The ref named by a "couldn't find remote ref" line.
fn missing_remote_ref(msg: &str) -> Option<String> {
    const MARKER: &str = "couldn't find remote ref ";
    msg.lines().find_map(|line| {
        let at = line.to_ascii_lowercase().find(MARKER)?;
        Some(line[at + MARKER.len()..].trim().to_string())
    })
}

/// Sort a failed command's output into an error category.
pub fn classify_cli_error(msg: String) -> GitCliError {
    let lower = msg.to_ascii_lowercase();
    if lower.contains("authentication failed")
        || lower.contains("could not read username")
        || lower.contains("invalid username or password")
        || lower.contains("terminal prompts disabled")
        || lower.contains("permission denied (publickey")
    {
        GitCliError::AuthFailed(msg)
    } else if lower.contains("[remote rejected]") || lower.contains("hook declined") {
        GitCliError::RemoteDeclined(msg)
    } else if lower.contains("non-fast-forward")
        || lower.contains("fetch first")
        || lower.contains("updates were rejected because the tip")
        || lower.contains("[rejected]")
    {
        GitCliError::PushRejected(msg)
    } else if let Some(name) = missing_remote_ref(&msg) {
        GitCliError::RemoteRefNotFound(name)
    } else if lower.contains("could not resolve host")
        || lower.contains("connection refused")
        || lower.contains("connection timed out")
        || lower.contains("network is unreachable")
        || lower.contains("unable to access")
        || lower.contains("could not read from remote repository")
        || lower.contains("does not appear to be a git repository")
    {
        GitCliError::Unreachable(msg)
    } else {
        GitCliError::CommandFailed(msg)
    }
}

/// Runs `git -C <dir> ...` with a deadline.
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
}

impl GitCli {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run git in `dir` and return stdout.
    ///
    /// Resolves as soon as the process exits, the timeout elapses or
    /// `cancel` fires, whichever is first. In the latter two cases the child
    /// is killed.
    pub async fn run<I, S>(
        &self,
        dir: &Path,
        args: I,
        cancel: &CancellationToken,
    ) -> Result<String, GitCliError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(dir)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if std::env::var_os("GIT_SSH_COMMAND").is_none() {
            cmd.env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes");
        }

        tracing::debug!(dir = %dir.display(), "running {:?}", cmd.as_std());

        let child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GitCliError::NotAvailable,
            _ => GitCliError::CommandFailed(e.to_string()),
        })?;

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(dir = %dir.display(), "git cancelled");
                return Err(GitCliError::Cancelled);
            }
            _ = tokio::time::sleep(self.timeout) => {
                tracing::debug!(dir = %dir.display(), "git timed out");
                return Err(GitCliError::TimedOut(self.timeout));
            }
            out = child.wait_with_output() => {
                out.map_err(|e| GitCliError::CommandFailed(e.to_string()))?
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let combined = match (stderr.is_empty(), stdout.is_empty()) {
                (true, true) => format!("git exited with {}", output.status),
                (false, true) => stderr,
                (true, false) => stdout,
                (false, false) => format!("{stderr}\n{stdout}"),
            };
            return Err(classify_cli_error(combined));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
