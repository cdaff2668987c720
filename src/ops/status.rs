//! ops::status
//!
//! Working-tree status as change-sets.
//!
//! The accessor reports each path's staged and unstaged status separately.
//! This module shapes that into the three views callers ask for: the
//! flattened status relative to HEAD, the staged side and the unstaged
//! side. All three are sorted by path so repeated reads of an unchanged
//! tree compare equal.

use crate::core::error::CoreError;
use crate::core::model::{ChangeSet, FileChange, FileStatus, RepoState};
use crate::git::{Git, StatusEntry};

/// Reads working-tree status through the accessor.
#[derive(Debug)]
pub struct StatusReader<'g> {
    git: &'g Git,
}

impl<'g> StatusReader<'g> {
    pub fn new(git: &'g Git) -> Self {
        Self { git }
    }

    /// One entry per changed path with its status relative to HEAD.
    pub fn working_tree(&self) -> Result<ChangeSet, CoreError> {
        Ok(flatten_entries(&self.git.status_entries()?))
    }

    /// Index relative to HEAD.
    pub fn staged(&self) -> Result<ChangeSet, CoreError> {
        Ok(staged_entries(&self.git.status_entries()?))
    }

    /// Working tree relative to the index; untracked files read as added.
    pub fn unstaged(&self) -> Result<ChangeSet, CoreError> {
        Ok(unstaged_entries(&self.git.status_entries()?))
    }

    /// Clean/dirty, HEAD mode and any paused operation.
    pub fn repo_state(&self) -> Result<RepoState, CoreError> {
        let state = self.git.state();
        Ok(RepoState {
            clean: self.git.status_entries()?.is_empty(),
            head: self.git.head()?,
            in_progress: state
                .is_in_progress()
                .then(|| state.description().to_string()),
        })
    }
}

pub(crate) fn flatten_entries(entries: &[StatusEntry]) -> ChangeSet {
    ChangeSet::sorted(
        entries
            .iter()
            .filter_map(|e| {
                let status = if e.conflicted {
                    Some(FileStatus::Modified)
                } else {
                    FileStatus::flatten(e.staged, e.unstaged)
                };
                status.map(|s| FileChange::new(e.path.clone(), s))
            })
            .collect(),
    )
}

fn staged_entries(entries: &[StatusEntry]) -> ChangeSet {
    ChangeSet::sorted(
        entries
            .iter()
            .filter_map(|e| e.staged.map(|s| FileChange::new(e.path.clone(), s)))
            .collect(),
    )
}

fn unstaged_entries(entries: &[StatusEntry]) -> ChangeSet {
    ChangeSet::sorted(
        entries
            .iter()
            .filter_map(|e| {
                let status = if e.conflicted {
                    Some(FileStatus::Modified)
                } else {
                    e.unstaged
                };
                status.map(|s| FileChange::new(e.path.clone(), s))
            })
            .collect(),
    )
}
