//! engine
//!
//! Async runtime around the repository components.
//!
//! # Architecture
//!
//! The engine is what the dispatcher and the CLI talk to. It owns:
//!
//! - a [`HandleRegistry`] of cached repositories, one lock per repository
//! - the [`Transport`] used for push, fetch and pull
//! - a [`CancelRegistry`] of in-flight network operations
//! - the loaded [`Config`]
//!
//! Every operation locates its repository by path, waits for that
//! repository's lock and runs the matching `ops` component on the blocking
//! pool. Callers on a single-threaded executor are never blocked by disk or
//! network I/O.
//!
//! # Invariants
//!
//! - Operations on one repository never overlap; operations on different
//!   repositories run in parallel
//! - Mutations also hold the cross-process repository lock
//! - Concurrent status polls on one repository share a single read
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use gitpane::core::config::Config;
//! use gitpane::engine::Engine;
//!
//! # async fn demo() -> Result<(), gitpane::core::error::CoreError> {
//! let engine = Engine::from_config(Config::default());
//! let branches = engine.list_branches(Path::new("/path/to/repo")).await?;
//! for branch in branches {
//!     println!("{}{}", if branch.is_head { "* " } else { "  " }, branch.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod poll;
pub mod registry;
pub mod remote;

pub use poll::Coalescer;
pub use registry::{HandleRegistry, LockSettings, RepoHandle};
pub use remote::{CancelGuard, CancelRegistry};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::error::CoreError;
use crate::core::model::{Branch, ChangeSet, Commit, CommitDetails, FileDiff, HeadRef, RepoState};
use crate::core::types::{Fingerprint, Oid};
use crate::git::{DiffSettings, GitCli, GitCliTransport, Transport};
use crate::ops::{BranchManager, DiffEngine, HistoryWalker, StatusReader, WorktreeMutator};

/// Entry point for every repository operation.
pub struct Engine {
    config: Config,
    registry: Arc<HandleRegistry>,
    transport: Arc<dyn Transport>,
    cancels: CancelRegistry,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("cancels", &self.cancels)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(
        config: Config,
        registry: Arc<HandleRegistry>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            registry,
            transport,
            cancels: CancelRegistry::new(),
        }
    }

    /// An engine with a fresh registry and the `git` CLI transport.
    pub fn from_config(config: Config) -> Self {
        let registry = Arc::new(HandleRegistry::new(LockSettings::from(&config)));
        let transport = Arc::new(GitCliTransport::new(GitCli::new(config.network_timeout())));
        Self::new(config, registry, transport)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    fn diff_settings(&self) -> DiffSettings {
        DiffSettings {
            context_lines: self.config.context_lines(),
            rename_threshold: self.config.rename_threshold(),
            max_inline_bytes: self.config.max_inline_bytes(),
        }
    }

    // =========================================================================
    // Handle lifecycle
    // =========================================================================

    /// Open and cache the repository containing `dir`; returns its root.
    pub async fn open_repository(&self, dir: &Path) -> Result<PathBuf, CoreError> {
        Ok(self.registry.open(dir).await?.root().to_path_buf())
    }

    pub fn close_repository(&self, dir: &Path) -> bool {
        self.registry.close(dir)
    }

    // =========================================================================
    // Branches
    // =========================================================================

    pub async fn list_branches(&self, dir: &Path) -> Result<Vec<Branch>, CoreError> {
        self.registry
            .open(dir)
            .await?
            .read(|git| BranchManager::new(git).list())
            .await
    }

    pub async fn head(&self, dir: &Path) -> Result<HeadRef, CoreError> {
        self.registry
            .open(dir)
            .await?
            .read(|git| BranchManager::new(git).head())
            .await
    }

    /// Full id of the commit `name` points at.
    pub async fn resolve_ref(&self, dir: &Path, name: &str) -> Result<Oid, CoreError> {
        let name = name.to_string();
        self.registry
            .open(dir)
            .await?
            .read(move |git| Ok(git.resolve_ref(&name)?))
            .await
    }

    pub async fn create_branch(&self, dir: &Path, name: &str) -> Result<(), CoreError> {
        let name = name.to_string();
        self.registry
            .open(dir)
            .await?
            .mutate(move |git| BranchManager::new(git).create(&name))
            .await
    }

    pub async fn switch_branch(&self, dir: &Path, name: &str) -> Result<(), CoreError> {
        let name = name.to_string();
        self.registry
            .open(dir)
            .await?
            .mutate(move |git| BranchManager::new(git).switch(&name))
            .await
    }

    pub async fn merge_branch(&self, dir: &Path, source: &str) -> Result<(), CoreError> {
        let source = source.to_string();
        self.registry
            .open(dir)
            .await?
            .mutate(move |git| BranchManager::new(git).merge(&source))
            .await
    }

    pub async fn delete_branch(&self, dir: &Path, name: &str) -> Result<(), CoreError> {
        let name = name.to_string();
        self.registry
            .open(dir)
            .await?
            .mutate(move |git| BranchManager::new(git).delete(&name))
            .await
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Commits on `branch`, newest first. `limit` falls back to the
    /// configured default.
    pub async fn list_commits(
        &self,
        dir: &Path,
        branch: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Commit>, CoreError> {
        let branch = branch.to_string();
        let limit = limit.or(self.config.default_history_limit());
        let settings = self.diff_settings();
        self.registry
            .open(dir)
            .await?
            .read(move |git| HistoryWalker::new(git, settings).list_commits(&branch, limit))
            .await
    }

    pub async fn get_commit(&self, dir: &Path, id: &str) -> Result<Commit, CoreError> {
        let id = id.to_string();
        let settings = self.diff_settings();
        self.registry
            .open(dir)
            .await?
            .read(move |git| HistoryWalker::new(git, settings).get_commit(&id))
            .await
    }

    pub async fn changed_files(&self, dir: &Path, id: &str) -> Result<ChangeSet, CoreError> {
        let id = id.to_string();
        let settings = self.diff_settings();
        self.registry
            .open(dir)
            .await?
            .read(move |git| HistoryWalker::new(git, settings).list_changed_files(&id))
            .await
    }

    pub async fn commit_details(&self, dir: &Path, id: &str) -> Result<CommitDetails, CoreError> {
        let id = id.to_string();
        let settings = self.diff_settings();
        self.registry
            .open(dir)
            .await?
            .read(move |git| HistoryWalker::new(git, settings).commit_details(&id))
            .await
    }

    // =========================================================================
    // Diffs
    // =========================================================================

    pub async fn diff_file_in_commit(
        &self,
        dir: &Path,
        commit: &str,
        path: &str,
    ) -> Result<FileDiff, CoreError> {
        let (commit, path) = (commit.to_string(), path.to_string());
        let settings = self.diff_settings();
        self.registry
            .open(dir)
            .await?
            .read(move |git| DiffEngine::new(git, settings).file_in_commit(&commit, &path))
            .await
    }

    pub async fn diff_file_between(
        &self,
        dir: &Path,
        from: &str,
        to: &str,
        path: &str,
    ) -> Result<FileDiff, CoreError> {
        let (from, to, path) = (from.to_string(), to.to_string(), path.to_string());
        let settings = self.diff_settings();
        self.registry
            .open(dir)
            .await?
            .read(move |git| DiffEngine::new(git, settings).file_between(&from, &to, &path))
            .await
    }

    pub async fn diff_working_tree_file(
        &self,
        dir: &Path,
        path: &str,
    ) -> Result<FileDiff, CoreError> {
        let path = path.to_string();
        let settings = self.diff_settings();
        self.registry
            .open(dir)
            .await?
            .read(move |git| DiffEngine::new(git, settings).working_tree_file(&path))
            .await
    }

    pub async fn diff_staged_file(&self, dir: &Path, path: &str) -> Result<FileDiff, CoreError> {
        let path = path.to_string();
        let settings = self.diff_settings();
        self.registry
            .open(dir)
            .await?
            .read(move |git| DiffEngine::new(git, settings).staged_file(&path))
            .await
    }

    pub async fn diff_unstaged_file(&self, dir: &Path, path: &str) -> Result<FileDiff, CoreError> {
        let path = path.to_string();
        let settings = self.diff_settings();
        self.registry
            .open(dir)
            .await?
            .read(move |git| DiffEngine::new(git, settings).unstaged_file(&path))
            .await
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Flattened working-tree status. Concurrent calls share one read.
    pub async fn status(&self, dir: &Path) -> Result<ChangeSet, CoreError> {
        self.registry.open(dir).await?.status().await
    }

    pub async fn status_fingerprint(&self, dir: &Path) -> Result<Fingerprint, CoreError> {
        Ok(self.status(dir).await?.fingerprint())
    }

    pub async fn staged_changes(&self, dir: &Path) -> Result<ChangeSet, CoreError> {
        self.registry
            .open(dir)
            .await?
            .read(|git| StatusReader::new(git).staged())
            .await
    }

    pub async fn unstaged_changes(&self, dir: &Path) -> Result<ChangeSet, CoreError> {
        self.registry
            .open(dir)
            .await?
            .read(|git| StatusReader::new(git).unstaged())
            .await
    }

    pub async fn repo_state(&self, dir: &Path) -> Result<RepoState, CoreError> {
        self.registry
            .open(dir)
            .await?
            .read(|git| StatusReader::new(git).repo_state())
            .await
    }

    // =========================================================================
    // Working tree
    // =========================================================================

    pub async fn stage_and_commit(
        &self,
        dir: &Path,
        message: &str,
        files: Vec<String>,
    ) -> Result<Oid, CoreError> {
        let message = message.to_string();
        self.registry
            .open(dir)
            .await?
            .mutate(move |git| WorktreeMutator::new(git).stage_and_commit(&message, &files))
            .await
    }

    pub async fn stage(&self, dir: &Path, files: Vec<String>) -> Result<(), CoreError> {
        self.registry
            .open(dir)
            .await?
            .mutate(move |git| WorktreeMutator::new(git).stage(&files))
            .await
    }

    pub async fn unstage(&self, dir: &Path, files: Vec<String>) -> Result<(), CoreError> {
        self.registry
            .open(dir)
            .await?
            .mutate(move |git| WorktreeMutator::new(git).unstage(&files))
            .await
    }

    pub async fn commit_staged(&self, dir: &Path, message: &str) -> Result<Oid, CoreError> {
        let message = message.to_string();
        self.registry
            .open(dir)
            .await?
            .mutate(move |git| WorktreeMutator::new(git).commit_staged(&message))
            .await
    }

    pub async fn discard_changes(&self, dir: &Path) -> Result<(), CoreError> {
        self.registry
            .open(dir)
            .await?
            .mutate(|git| WorktreeMutator::new(git).discard_changes())
            .await
    }
}
