//! engine::registry
//!
//! Repository handles, cached per path, each behind its own lock.
//!
//! # Architecture
//!
//! [`HandleRegistry`] maps a normalized absolute path to a shared
//! [`RepoHandle`]. Paths inside the same work tree resolve to the same
//! handle, so a subdirectory and the repository root never get separate
//! locks. The registry is an ordinary value passed to whoever needs it;
//! there is no process-global instance.
//!
//! A [`RepoHandle`] owns the open repository. Every operation waits for
//! the handle's async mutex (bounded by the configured lock wait, after
//! which it fails with [`CoreError::LockContention`]) and then runs on the
//! blocking pool so the caller's executor never stalls on disk I/O.
//! Mutations additionally take the cross-process [`RepoLock`].
//!
//! # Invariants
//!
//! - One handle per repository work tree
//! - Reads and mutations on a handle never overlap
//! - A handle whose repository disappeared is reopened on next use; if
//!   that fails, the error is returned and the handle stays usable for a
//!   later retry

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;

use crate::core::config::Config;
use crate::core::error::CoreError;
use crate::core::model::ChangeSet;
use crate::core::ops::RepoLock;
use crate::git::Git;
use crate::ops::StatusReader;

use super::poll::Coalescer;

/// Lock timing for every handle a registry creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// How long to wait for a busy handle before `LockContention`
    pub wait: Duration,
    pub retry_interval: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(2),
            retry_interval: Duration::from_millis(50),
        }
    }
}

impl From<&Config> for LockSettings {
    fn from(config: &Config) -> Self {
        Self {
            wait: config.lock_wait(),
            retry_interval: config.lock_retry_interval(),
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> CoreError {
    CoreError::internal(format!("repository worker failed: {err}"))
}

/// Make sure `slot` holds a usable repository, reopening it if needed.
fn ensure_open<'a>(slot: &'a mut Option<Git>, root: &Path) -> Result<&'a Git, CoreError> {
    if slot.as_ref().is_some_and(|git| !git.is_valid()) {
        tracing::debug!(root = %root.display(), "repository changed underneath, reopening");
        *slot = None;
    }
    if slot.is_none() {
        *slot = Some(Git::open(root)?);
    }
    slot.as_ref()
        .ok_or_else(|| CoreError::internal("repository slot empty after open"))
}

/// A cached, lock-protected repository.
#[derive(Debug)]
pub struct RepoHandle {
    root: PathBuf,
    repo: Arc<tokio::sync::Mutex<Option<Git>>>,
    status: Coalescer<Result<ChangeSet, CoreError>>,
    locking: LockSettings,
}

impl RepoHandle {
    fn new(root: PathBuf, git: Git, locking: LockSettings) -> Self {
        Self {
            root,
            repo: Arc::new(tokio::sync::Mutex::new(Some(git))),
            status: Coalescer::new(),
            locking,
        }
    }

    /// Work-tree root this handle is keyed by.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn lock(&self) -> Result<OwnedMutexGuard<Option<Git>>, CoreError> {
        match tokio::time::timeout(self.locking.wait, Arc::clone(&self.repo).lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::debug!(root = %self.root.display(), "handle busy past lock wait");
                Err(CoreError::LockContention {
                    path: self.root.clone(),
                })
            }
        }
    }

    /// Run a read-only operation.
    pub async fn read<T, F>(&self, op: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Git) -> Result<T, CoreError> + Send + 'static,
        T: Send + 'static,
    {
        let mut guard = self.lock().await?;
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || op(ensure_open(&mut guard, &root)?))
            .await
            .map_err(join_error)?
    }

    /// Run a mutating operation under the cross-process lock as well.
    pub async fn mutate<T, F>(&self, op: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Git) -> Result<T, CoreError> + Send + 'static,
        T: Send + 'static,
    {
        let mut guard = self.lock().await?;
        let root = self.root.clone();
        let locking = self.locking;
        tokio::task::spawn_blocking(move || {
            let git = ensure_open(&mut guard, &root)?;
            let _repo_lock =
                RepoLock::acquire_within(git.git_dir(), locking.wait, locking.retry_interval)?;
            op(git)
        })
        .await
        .map_err(join_error)?
    }

    /// Run `prepare` like [`mutate`](Self::mutate), then await `finish`
    /// with its output while both locks are still held.
    ///
    /// Network operations use this: the repository is read on the blocking
    /// pool, then the async transport runs without a worker thread parked.
    pub async fn mutate_then<P, T, F, Fut, R>(&self, prepare: P, finish: F) -> Result<R, CoreError>
    where
        P: FnOnce(&Git) -> Result<T, CoreError> + Send + 'static,
        T: Send + 'static,
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<R, CoreError>>,
    {
        let guard = self.lock().await?;
        let root = self.root.clone();
        let locking = self.locking;
        let (guard, prepared) = tokio::task::spawn_blocking(move || {
            let mut guard = guard;
            let prepared = ensure_open(&mut guard, &root).and_then(|git| {
                let repo_lock =
                    RepoLock::acquire_within(git.git_dir(), locking.wait, locking.retry_interval)?;
                Ok((repo_lock, prepare(git)?))
            });
            (guard, prepared)
        })
        .await
        .map_err(join_error)?;

        let (repo_lock, value) = prepared?;
        let result = finish(value).await;
        drop(repo_lock);
        drop(guard);
        result
    }

    /// Flattened working-tree status, coalescing concurrent polls.
    pub async fn status(&self) -> Result<ChangeSet, CoreError> {
        self.status
            .run(|| self.read(|git| StatusReader::new(git).working_tree()))
            .await
    }
}

#[derive(Debug, Default)]
struct Entries {
    /// Requested path -> work-tree root
    aliases: HashMap<PathBuf, PathBuf>,
    /// Work-tree root -> handle
    handles: HashMap<PathBuf, Arc<RepoHandle>>,
}

/// Injectable cache of open repositories.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    entries: Mutex<Entries>,
    locking: LockSettings,
}

impl HandleRegistry {
    pub fn new(locking: LockSettings) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            locking,
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The handle for the repository containing `path`, opening it on first
    /// use.
    ///
    /// # Errors
    ///
    /// - [`CoreError::PathNotFound`] if `path` does not exist
    /// - [`CoreError::NotARepository`] if no work tree contains it
    pub async fn open(&self, path: &Path) -> Result<Arc<RepoHandle>, CoreError> {
        let requested = match tokio::fs::canonicalize(path).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CoreError::PathNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(CoreError::internal(e)),
        };

        {
            let entries = self.entries();
            if let Some(handle) = entries
                .aliases
                .get(&requested)
                .and_then(|root| entries.handles.get(root))
            {
                return Ok(Arc::clone(handle));
            }
        }

        let lookup = requested.clone();
        let git = tokio::task::spawn_blocking(move || Git::open(&lookup))
            .await
            .map_err(join_error)??;
        let root = std::fs::canonicalize(git.work_dir()).map_err(CoreError::internal)?;
        tracing::debug!(path = %requested.display(), root = %root.display(), "opened repository");

        let mut entries = self.entries();
        entries.aliases.insert(requested, root.clone());
        let locking = self.locking;
        let handle = entries
            .handles
            .entry(root.clone())
            .or_insert_with(|| Arc::new(RepoHandle::new(root, git, locking)));
        Ok(Arc::clone(handle))
    }

    /// Drop the cached handle for the repository `path` belongs to.
    ///
    /// Returns false if nothing was cached. In-flight operations keep their
    /// own reference and finish normally.
    pub fn close(&self, path: &Path) -> bool {
        let requested = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut entries = self.entries();
        let root = entries
            .aliases
            .get(&requested)
            .cloned()
            .or_else(|| entries.handles.contains_key(&requested).then(|| requested.clone()));

        match root {
            Some(root) => {
                entries.aliases.retain(|_, r| *r != root);
                let removed = entries.handles.remove(&root).is_some();
                if removed {
                    tracing::debug!(root = %root.display(), "closed repository handle");
                }
                removed
            }
            None => false,
        }
    }

    /// Number of distinct repositories cached.
    pub fn len(&self) -> usize {
        self.entries().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
