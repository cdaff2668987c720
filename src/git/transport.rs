//! git::transport
//!
//! Network operations behind a trait.
//!
//! # Design
//!
//! [`Transport`] is async because push, fetch and pull wait on the network.
//! The production implementation, [`GitCliTransport`], shells out to `git`;
//! tests substitute their own implementation to script failures such as
//! rejected pushes or hung remotes.
//!
//! Every method takes a [`CancellationToken`]. A cancelled operation stops
//! the underlying process; ref updates are atomic in git, so no partially
//! written refs remain. A cancelled or conflicting `pull --rebase` is
//! aborted so the branch is back where it started.

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::cli::{GitCli, GitCliError};

/// The branch pair a push or pull operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub remote: String,
    pub local_branch: String,
    pub remote_branch: String,
    /// False when the local branch has no upstream configured yet
    pub has_upstream: bool,
}

impl RemoteTarget {
    fn refspec(&self) -> String {
        format!(
            "refs/heads/{}:refs/heads/{}",
            self.local_branch, self.remote_branch
        )
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Push the local branch. Sets the upstream when none exists.
    async fn push(
        &self,
        work_dir: &Path,
        target: &RemoteTarget,
        cancel: &CancellationToken,
    ) -> Result<(), GitCliError>;

    /// Fetch all branches of `remote`.
    async fn fetch(
        &self,
        work_dir: &Path,
        remote: &str,
        cancel: &CancellationToken,
    ) -> Result<(), GitCliError>;

    /// Fetch the remote branch and rebase the local branch onto it.
    async fn pull(
        &self,
        work_dir: &Path,
        target: &RemoteTarget,
        cancel: &CancellationToken,
    ) -> Result<(), GitCliError>;
}

/// [`Transport`] over the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCliTransport {
    cli: GitCli,
}

impl GitCliTransport {
    pub fn new(cli: GitCli) -> Self {
        Self { cli }
    }

    /// Abort a rebase left behind by a failed pull. Best effort.
    async fn abort_rebase(&self, work_dir: &Path) {
        let cleanup = CancellationToken::new();
        if let Err(err) = self.cli.run(work_dir, ["rebase", "--abort"], &cleanup).await {
            tracing::debug!(%err, "no rebase to abort");
        }
    }

    async fn unmerged_paths(&self, work_dir: &Path) -> Vec<String> {
        let cleanup = CancellationToken::new();
        self.cli
            .run(work_dir, ["diff", "--name-only", "--diff-filter=U"], &cleanup)
            .await
            .map(|out| out.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for GitCliTransport {
    async fn push(
        &self,
        work_dir: &Path,
        target: &RemoteTarget,
        cancel: &CancellationToken,
    ) -> Result<(), GitCliError> {
        let mut args = vec!["push".to_string()];
        if !target.has_upstream {
            args.push("--set-upstream".into());
        }
        args.push(target.remote.clone());
        args.push(target.refspec());

        self.cli.run(work_dir, &args, cancel).await?;
        Ok(())
    }

    async fn fetch(
        &self,
        work_dir: &Path,
        remote: &str,
        cancel: &CancellationToken,
    ) -> Result<(), GitCliError> {
        self.cli.run(work_dir, ["fetch", remote], cancel).await?;
        Ok(())
    }

    async fn pull(
        &self,
        work_dir: &Path,
        target: &RemoteTarget,
        cancel: &CancellationToken,
    ) -> Result<(), GitCliError> {
        let args = [
            "pull",
            "--rebase",
            target.remote.as_str(),
            target.remote_branch.as_str(),
        ];
        match self.cli.run(work_dir, args, cancel).await {
            Ok(_) => Ok(()),
            Err(GitCliError::CommandFailed(msg))
                if msg.to_ascii_lowercase().contains("conflict") =>
            {
                let paths = self.unmerged_paths(work_dir).await;
                self.abort_rebase(work_dir).await;
                Err(GitCliError::RebaseConflict(paths))
            }
            Err(err @ (GitCliError::Cancelled | GitCliError::TimedOut(_))) => {
                self.abort_rebase(work_dir).await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}
