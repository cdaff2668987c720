//! core::ops::lock
//!
//! Cross-process repository lock for mutating commands.
//!
//! # Architecture
//!
//! Within one process the handle registry serializes commands on a
//! repository. This lock extends the single-writer guarantee across
//! processes: a mutating command holds it for its whole duration, so two
//! gitpane processes (or a `serve` loop and a one-shot `exec`) never
//! interleave writes on the same repository.
//!
//! # Storage
//!
//! - `<git_dir>/gitpane/lock` - Lock file with an OS-level exclusive lock
//!
//! # Invariants
//!
//! - The lock is released on drop (RAII), including on panic unwind
//! - [`RepoLock::acquire`] never blocks; [`RepoLock::acquire_within`]
//!   blocks for at most the given wait
//! - The lock file is never deleted, only unlocked
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::time::Duration;
//! use gitpane::core::ops::lock::RepoLock;
//!
//! let lock = RepoLock::acquire_within(
//!     Path::new("/repo/.git"),
//!     Duration::from_secs(2),
//!     Duration::from_millis(50),
//! )?;
//! // mutate the repository
//! drop(lock);
//! # Ok::<(), gitpane::core::ops::lock::LockError>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

use crate::core::error::CoreError;

/// Directory under the git dir that holds gitpane's files.
const LOCK_DIR: &str = "gitpane";
const LOCK_FILE: &str = "lock";

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process holds the lock.
    #[error("repository is locked by another gitpane process: {}", path.display())]
    AlreadyLocked { path: PathBuf },

    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

impl From<LockError> for CoreError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::AlreadyLocked { path } => CoreError::LockContention { path },
            other => CoreError::internal(other),
        }
    }
}

/// An exclusive lock on one repository.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    /// Open handle holding the OS lock; `None` once released
    file: Option<File>,
}

impl RepoLock {
    /// Path of the lock file for a repository's git dir.
    pub fn lock_path(git_dir: &Path) -> PathBuf {
        git_dir.join(LOCK_DIR).join(LOCK_FILE)
    }

    /// Try once to take the lock.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another holder has it
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock call fails otherwise
    pub fn acquire(git_dir: &Path) -> Result<Self, LockError> {
        let dir = git_dir.join(LOCK_DIR);
        fs::create_dir_all(&dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyLocked { path })
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Take the lock, retrying every `retry` until `wait` has elapsed.
    ///
    /// Blocks the calling thread; run it on a blocking pool.
    pub fn acquire_within(
        git_dir: &Path,
        wait: Duration,
        retry: Duration,
    ) -> Result<Self, LockError> {
        let deadline = Instant::now() + wait;
        loop {
            match Self::acquire(git_dir) {
                Err(LockError::AlreadyLocked { path }) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(LockError::AlreadyLocked { path });
                    }
                    tracing::debug!(path = %path.display(), "lock held elsewhere, retrying");
                    std::thread::sleep(retry.min(deadline - now));
                }
                other => return other,
            }
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn acquire_creates_directory_and_file() {
        let temp = TempDir::new().unwrap();
        let lock = RepoLock::acquire(temp.path()).expect("acquire");
        assert!(lock.is_held());
        assert_eq!(lock.path(), RepoLock::lock_path(temp.path()));
        assert!(lock.path().exists());
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let temp = TempDir::new().unwrap();
        let _held = RepoLock::acquire(temp.path()).expect("first acquire");

        let result = RepoLock::acquire(temp.path());
        assert!(matches!(result, Err(LockError::AlreadyLocked { .. })));
    }

    #[test]
    fn released_on_drop() {
        let temp = TempDir::new().unwrap();
        {
            let _lock = RepoLock::acquire(temp.path()).expect("first acquire");
        }
        assert!(RepoLock::acquire(temp.path()).is_ok());
    }

    #[test]
    fn bounded_wait_gives_up() {
        let temp = TempDir::new().unwrap();
        let _held = RepoLock::acquire(temp.path()).expect("first acquire");

        let started = Instant::now();
        let result = RepoLock::acquire_within(
            temp.path(),
            Duration::from_millis(100),
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(LockError::AlreadyLocked { .. })));
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn bounded_wait_succeeds_after_release() {
        let temp = TempDir::new().unwrap();
        let held = RepoLock::acquire(temp.path()).expect("first acquire");

        let dir = temp.path().to_path_buf();
        let waiter = std::thread::spawn(move || {
            RepoLock::acquire_within(&dir, Duration::from_secs(5), Duration::from_millis(10))
        });
        std::thread::sleep(Duration::from_millis(50));
        drop(held);

        let lock = waiter.join().unwrap().expect("acquire after release");
        assert!(lock.is_held());
    }

    #[test]
    fn contention_maps_to_lock_contention_kind() {
        let err: CoreError = LockError::AlreadyLocked {
            path: PathBuf::from("/r/.git/gitpane/lock"),
        }
        .into();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::LockContention);
    }
}
