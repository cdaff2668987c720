//! ops::worktree
//!
//! Staging, committing and discarding working-tree changes.
//!
//! # Invariants
//!
//! - `stage_and_commit` commits exactly the selected paths: anything else
//!   that was staged is unstaged first and stays modified in the working
//!   tree
//! - Nothing is committed while a merge or rebase is paused
//! - `discard_changes` leaves the repository clean: tracked files match
//!   HEAD, untracked files are gone, no operation is in progress

use std::collections::BTreeSet;

use crate::core::error::CoreError;
use crate::core::model::FileStatus;
use crate::core::types::Oid;
use crate::git::{Git, StatusEntry};

/// Trimmed commit message, or an error if nothing is left.
pub fn validate_message(message: &str) -> Result<&str, CoreError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(CoreError::EmptyCommitMessage);
    }
    Ok(trimmed)
}

/// A selection entry matches the path itself or anything beneath it.
fn selects(selection: &BTreeSet<&str>, path: &str) -> bool {
    selection.contains(path)
        || selection.iter().any(|sel| {
            path.strip_prefix(sel.trim_end_matches('/'))
                .is_some_and(|rest| rest.starts_with('/'))
        })
}

fn normalize(paths: &[String]) -> BTreeSet<&str> {
    paths
        .iter()
        .map(|p| p.trim_start_matches("./"))
        .filter(|p| !p.is_empty())
        .collect()
}

fn is_changed(entry: &StatusEntry) -> bool {
    entry.conflicted || FileStatus::flatten(entry.staged, entry.unstaged).is_some()
}

#[derive(Debug)]
pub struct WorktreeMutator<'g> {
    git: &'g Git,
}

impl<'g> WorktreeMutator<'g> {
    pub fn new(git: &'g Git) -> Self {
        Self { git }
    }

    /// Stage the selected paths and commit exactly them.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EmptyCommitMessage`] if the message is blank
    /// - [`CoreError::NoFilesSelected`] if `files` is empty
    /// - [`CoreError::NothingToCommit`] if none of the selected paths has a
    ///   change
    pub fn stage_and_commit(&self, message: &str, files: &[String]) -> Result<Oid, CoreError> {
        let message = validate_message(message)?;
        let selection = normalize(files);
        if selection.is_empty() {
            return Err(CoreError::NoFilesSelected);
        }
        self.git.ensure_no_operation()?;

        let entries = self.git.status_entries()?;
        let selected: Vec<String> = entries
            .iter()
            .filter(|e| is_changed(e) && selects(&selection, &e.path))
            .map(|e| e.path.clone())
            .collect();
        if selected.is_empty() {
            return Err(CoreError::NothingToCommit);
        }

        let unselected_staged: Vec<String> = entries
            .iter()
            .filter(|e| e.staged.is_some() && !selects(&selection, &e.path))
            .map(|e| e.path.clone())
            .collect();

        let snapshot = self.git.index_snapshot()?;
        let committed = self.commit_selection(message, &selected, &unselected_staged);
        if committed.is_err() {
            self.git.restore_index(snapshot)?;
        }
        let id = committed?;
        tracing::info!(commit = %id.short(7), files = selected.len(), "committed");
        Ok(id)
    }

    fn commit_selection(
        &self,
        message: &str,
        selected: &[String],
        unselected_staged: &[String],
    ) -> Result<Oid, CoreError> {
        self.git.unstage(unselected_staged)?;
        self.git.stage(selected)?;
        if !self.git.has_staged_changes()? {
            return Err(CoreError::NothingToCommit);
        }
        Ok(self.git.commit_index(message)?)
    }

    /// Stage the working-tree state of `paths`. Unchanged paths are skipped.
    pub fn stage(&self, paths: &[String]) -> Result<(), CoreError> {
        let selection = normalize(paths);
        if selection.is_empty() {
            return Err(CoreError::NoFilesSelected);
        }
        let targets: Vec<String> = self
            .git
            .status_entries()?
            .into_iter()
            .filter(|e| (e.unstaged.is_some() || e.conflicted) && selects(&selection, &e.path))
            .map(|e| e.path)
            .collect();
        self.git.stage(&targets)?;
        Ok(())
    }

    /// Return staged `paths` to their HEAD state in the index; the working
    /// tree is untouched.
    pub fn unstage(&self, paths: &[String]) -> Result<(), CoreError> {
        let selection = normalize(paths);
        if selection.is_empty() {
            return Err(CoreError::NoFilesSelected);
        }
        let targets: Vec<String> = self
            .git
            .status_entries()?
            .into_iter()
            .filter(|e| e.staged.is_some() && selects(&selection, &e.path))
            .map(|e| e.path)
            .collect();
        self.git.unstage(&targets)?;
        Ok(())
    }

    /// Commit whatever is currently staged.
    pub fn commit_staged(&self, message: &str) -> Result<Oid, CoreError> {
        let message = validate_message(message)?;
        self.git.ensure_no_operation()?;
        if !self.git.has_staged_changes()? {
            return Err(CoreError::NothingToCommit);
        }
        let id = self.git.commit_index(message)?;
        tracing::info!(commit = %id.short(7), "committed staged changes");
        Ok(id)
    }

    /// Throw away every uncommitted change, including untracked files.
    pub fn discard_changes(&self) -> Result<(), CoreError> {
        self.git.discard_all()?;
        tracing::info!(repo = %self.git.work_dir().display(), "discarded changes");
        Ok(())
    }
}
