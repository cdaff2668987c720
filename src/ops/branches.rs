//! ops::branches
//!
//! Branch listing, creation, switching, merging and deletion.
//!
//! # Preconditions
//!
//! `switch` and `merge` refuse to run when uncommitted changes touch a
//! path the operation would rewrite. The check intersects the dirty paths
//! from the status read with the paths that differ between the current
//! tree and the incoming one, and reports the overlap as
//! [`CoreError::UncommittedChangesBlocking`]. Changes to other paths are
//! carried over untouched.

use std::collections::HashSet;

use crate::core::error::CoreError;
use crate::core::model::{Branch, HeadRef};
use crate::core::types::{BranchName, Oid};
use crate::git::{Git, GitError, MergeOutcome};

/// Map a not-found lookup on `name` to [`CoreError::UnknownBranch`].
fn unknown_branch(name: &str) -> impl Fn(GitError) -> CoreError + '_ {
    move |err| match err {
        GitError::RefNotFound { .. } => CoreError::UnknownBranch {
            name: name.to_string(),
        },
        other => other.into(),
    }
}

#[derive(Debug)]
pub struct BranchManager<'g> {
    git: &'g Git,
}

impl<'g> BranchManager<'g> {
    pub fn new(git: &'g Git) -> Self {
        Self { git }
    }

    /// Local branches then remote-tracking branches, each sorted by name.
    pub fn list(&self) -> Result<Vec<Branch>, CoreError> {
        let mut branches = self.git.branches()?;
        branches.sort_by(|a, b| (a.is_remote, &a.name).cmp(&(b.is_remote, &b.name)));
        Ok(branches)
    }

    pub fn head(&self) -> Result<HeadRef, CoreError> {
        Ok(self.git.head()?)
    }

    /// Create `name` at HEAD without switching to it.
    pub fn create(&self, name: &str) -> Result<(), CoreError> {
        let name = BranchName::new(name)?;
        if self.git.local_branch_exists(name.as_str()) {
            return Err(CoreError::BranchAlreadyExists {
                name: name.to_string(),
            });
        }
        self.git.create_branch(&name)?;
        tracing::debug!(branch = %name, "created branch");
        Ok(())
    }

    /// Check out `name`.
    ///
    /// When no local branch has that name but exactly one remote has a
    /// branch of that name, a local branch tracking it is created first.
    pub fn switch(&self, name: &str) -> Result<(), CoreError> {
        self.git.ensure_no_operation()?;

        let head = self.git.head()?;
        if matches!(&head, HeadRef::Branch { name: current } if current == name) {
            return Ok(());
        }

        let (target, track) = if self.git.local_branch_exists(name) {
            let target = self
                .git
                .resolve_ref(&format!("refs/heads/{name}"))
                .map_err(unknown_branch(name))?;
            (target, None)
        } else {
            match self.git.remote_branches_named(name)?.as_slice() {
                [remote_branch] => {
                    let target = self
                        .git
                        .resolve_ref(&format!("refs/remotes/{remote_branch}"))
                        .map_err(unknown_branch(name))?;
                    (target, Some(remote_branch.clone()))
                }
                _ => {
                    return Err(CoreError::UnknownBranch {
                        name: name.to_string(),
                    })
                }
            }
        };

        let blocking = self.blocking_paths(self.git.head_oid()?.as_ref(), &target)?;
        if !blocking.is_empty() {
            return Err(CoreError::UncommittedChangesBlocking { paths: blocking });
        }

        if let Some(remote_branch) = track {
            let local = BranchName::new(name)?;
            self.git.create_tracking_branch(&local, &remote_branch)?;
            tracing::debug!(branch = name, upstream = %remote_branch, "created tracking branch");
        }

        self.git.checkout_branch(name).map_err(|err| match err {
            GitError::CheckoutConflict { paths } => CoreError::UncommittedChangesBlocking { paths },
            other => unknown_branch(name)(other),
        })
    }

    /// Merge `source` into the checked-out branch.
    ///
    /// Fast-forwards when possible, otherwise commits a merge. Conflicts are
    /// reported as [`CoreError::MergeConflict`] and left in the working tree
    /// for the caller to resolve or discard.
    pub fn merge(&self, source: &str) -> Result<(), CoreError> {
        self.git.ensure_no_operation()?;

        let current = match self.git.head()? {
            HeadRef::Detached { .. } => return Err(CoreError::DetachedHead),
            HeadRef::Branch { name } | HeadRef::Unborn { name } => name,
        };
        let incoming = self.git.resolve_ref(source).map_err(unknown_branch(source))?;
        if current == source {
            return Ok(());
        }

        let head = self.git.head_oid()?;
        let base = match &head {
            Some(head) => self.git.merge_base(head, &incoming)?,
            None => None,
        };
        let blocking = self.blocking_paths(base.as_ref(), &incoming)?;
        if !blocking.is_empty() {
            return Err(CoreError::UncommittedChangesBlocking { paths: blocking });
        }

        let outcome = self.git.merge_branch(source).map_err(|err| match err {
            GitError::CheckoutConflict { paths } => CoreError::UncommittedChangesBlocking { paths },
            other => unknown_branch(source)(other),
        })?;
        tracing::debug!(source, into = %current, ?outcome, "merge finished");

        match outcome {
            MergeOutcome::Conflicts(paths) => Err(CoreError::MergeConflict { paths }),
            MergeOutcome::UpToDate | MergeOutcome::FastForward(_) | MergeOutcome::Merged(_) => {
                Ok(())
            }
        }
    }

    /// Delete local branch `name`. The checked-out branch cannot be deleted.
    pub fn delete(&self, name: &str) -> Result<(), CoreError> {
        if self.git.head()?.branch_name() == Some(name) {
            return Err(CoreError::CannotDeleteHead {
                name: name.to_string(),
            });
        }
        if !self.git.local_branch_exists(name) {
            return Err(CoreError::UnknownBranch {
                name: name.to_string(),
            });
        }
        self.git.delete_branch(name).map_err(unknown_branch(name))
    }

    /// Dirty paths that also differ between `from` and `to`.
    fn blocking_paths(&self, from: Option<&Oid>, to: &Oid) -> Result<Vec<String>, CoreError> {
        let dirty = self.git.status_entries()?;
        if dirty.is_empty() {
            return Ok(Vec::new());
        }
        let incoming: HashSet<String> = self.git.paths_between(from, to)?.into_iter().collect();
        Ok(dirty
            .into_iter()
            .map(|e| e.path)
            .filter(|path| incoming.contains(path))
            .collect())
    }
}
