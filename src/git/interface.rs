//! git::interface
//!
//! Repository accessor built on git2.
//!
//! # Architecture
//!
//! [`Git`] wraps one `git2::Repository` and is the only type in the crate
//! that touches it. Every other component reads and mutates the repository
//! through the methods here, which return crate types ([`Branch`],
//! [`Commit`], [`HeadRef`], [`Oid`]) rather than git2 objects.
//!
//! # Error Handling
//!
//! git2 failures are normalized into [`GitError`] variants at this
//! boundary. Context-free lookups report [`GitError::RefNotFound`] or
//! [`GitError::ObjectNotFound`]; callers decide whether that means an
//! unknown branch or an unknown commit.
//!
//! # Example
//!
//! ```no_run
//! use gitpane::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! println!("HEAD is {}", git.head()?);
//! # Ok::<(), gitpane::git::GitError>(())
//! ```

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use thiserror::Error;

use crate::core::model::{Branch, Commit, CommitNode, FileStatus, HeadRef};
use crate::core::types::{BranchName, Oid};

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository: {}", path.display())]
    NotARepo { path: PathBuf },

    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    /// Repository has no working directory.
    #[error("bare repository not supported: {}", path.display())]
    BareRepo { path: PathBuf },

    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },

    #[error("object not found: {oid}")]
    ObjectNotFound { oid: String },

    #[error("branch already exists: {name}")]
    BranchExists { name: String },

    #[error("invalid ref name: {message}")]
    InvalidRefName { message: String },

    /// Checkout would overwrite local changes.
    #[error("checkout would overwrite: {}", paths.join(", "))]
    CheckoutConflict { paths: Vec<String> },

    #[error("{operation} in progress")]
    OperationInProgress { operation: GitState },

    /// HEAD names a branch with no commits.
    #[error("HEAD has no commits yet")]
    UnbornHead,

    #[error("i/o error: {message}")]
    Io { message: String },

    #[error("git error: {message}")]
    Internal { message: String },
}

impl GitError {
    /// Map a git2 error, naming what was being looked up.
    fn lookup(err: git2::Error, what: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound | git2::ErrorCode::InvalidSpec => GitError::RefNotFound {
                refname: what.to_string(),
            },
            _ => GitError::from(err),
        }
    }

    /// Map a git2 error from resolving an object id or revspec.
    fn object(err: git2::Error, what: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound
            | git2::ErrorCode::InvalidSpec
            | git2::ErrorCode::Ambiguous
            | git2::ErrorCode::Peel => GitError::ObjectNotFound {
                oid: what.to_string(),
            },
            _ => GitError::from(err),
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::Conflict => GitError::CheckoutConflict { paths: Vec::new() },
            git2::ErrorCode::UnbornBranch => GitError::UnbornHead,
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

impl From<std::io::Error> for GitError {
    fn from(err: std::io::Error) -> Self {
        GitError::Io {
            message: err.to_string(),
        }
    }
}

/// An operation paused in the repository, usually on conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitState {
    Clean,
    Merge,
    Rebase,
    CherryPick,
    Revert,
    Bisect,
    ApplyMailbox,
}

impl GitState {
    /// True for anything but [`GitState::Clean`].
    ///
    /// ```
    /// use gitpane::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Merge.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Merge => "merge",
            GitState::Rebase => "rebase",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
            GitState::ApplyMailbox => "apply-mailbox",
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// One path in the working-tree status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    /// Index relative to HEAD
    pub staged: Option<FileStatus>,
    /// Working tree relative to the index; untracked files are `Added`
    pub unstaged: Option<FileStatus>,
    pub conflicted: bool,
}

impl StatusEntry {
    /// Present only in the working tree.
    pub fn is_untracked(&self) -> bool {
        self.staged.is_none() && self.unstaged == Some(FileStatus::Added)
    }
}

/// Result of merging a branch into HEAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    UpToDate,
    FastForward(Oid),
    Merged(Oid),
    /// The merge stopped with conflicts; the repository is left mid-merge.
    Conflicts(Vec<String>),
}

/// Where push and pull should go for the current branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub remote: String,
    /// Branch name on the remote
    pub branch: String,
}

/// Saved index contents, taken before a multi-step index edit.
pub struct IndexSnapshot(Vec<git2::IndexEntry>);

impl std::fmt::Debug for IndexSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("IndexSnapshot").field(&self.0.len()).finish()
    }
}

/// A git2 repository with a working directory.
pub struct Git {
    pub(super) repo: git2::Repository,
    work_dir: PathBuf,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

/// Convert a git2 id to the crate's strong type.
pub(super) fn to_oid(id: git2::Oid) -> Result<Oid, GitError> {
    Oid::new(id.to_string()).map_err(|e| GitError::Internal {
        message: e.to_string(),
    })
}

fn commit_record(commit: &git2::Commit<'_>) -> Commit {
    let author = commit.author();
    Commit {
        id: commit.id().to_string(),
        author: author.name().unwrap_or_default().to_string(),
        email: author.email().unwrap_or_default().to_string(),
        message: commit.message().unwrap_or_default().to_string(),
        timestamp: commit.time().seconds(),
    }
}

impl Git {
    // =========================================================================
    // Opening
    // =========================================================================

    /// Open the repository containing `path`.
    ///
    /// Discovery walks parent directories, so any path inside a work tree
    /// opens its repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotFound`] if `path` does not exist
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        if !path.exists() {
            return Err(GitError::PathNotFound {
                path: path.to_path_buf(),
            });
        }

        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        let work_dir = match repo.workdir() {
            Some(dir) if !repo.is_bare() => dir.to_path_buf(),
            _ => {
                return Err(GitError::BareRepo {
                    path: path.to_path_buf(),
                })
            }
        };

        Ok(Self { repo, work_dir })
    }

    /// Root of the working tree.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// True while the repository directories still exist on disk.
    pub fn is_valid(&self) -> bool {
        self.repo.path().is_dir() && self.work_dir.is_dir()
    }

    pub fn state(&self) -> GitState {
        use git2::RepositoryState as S;
        match self.repo.state() {
            S::Clean => GitState::Clean,
            S::Merge => GitState::Merge,
            S::Rebase | S::RebaseInteractive | S::RebaseMerge => GitState::Rebase,
            S::CherryPick | S::CherryPickSequence => GitState::CherryPick,
            S::Revert | S::RevertSequence => GitState::Revert,
            S::Bisect => GitState::Bisect,
            S::ApplyMailbox | S::ApplyMailboxOrRebase => GitState::ApplyMailbox,
        }
    }

    /// Fail with [`GitError::OperationInProgress`] unless the state is clean.
    pub fn ensure_no_operation(&self) -> Result<(), GitError> {
        match self.state() {
            GitState::Clean => Ok(()),
            operation => Err(GitError::OperationInProgress { operation }),
        }
    }

    // =========================================================================
    // HEAD and ref resolution
    // =========================================================================

    /// What HEAD points at.
    pub fn head(&self) -> Result<HeadRef, GitError> {
        match self.repo.head() {
            Ok(head) => {
                if self.repo.head_detached()? {
                    let commit = head.peel_to_commit()?;
                    return Ok(HeadRef::Detached {
                        commit: commit.id().to_string(),
                    });
                }
                let name = head.name().unwrap_or("HEAD");
                Ok(HeadRef::Branch {
                    name: name.strip_prefix("refs/heads/").unwrap_or(name).to_string(),
                })
            }
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                let head = self.repo.find_reference("HEAD")?;
                let target = head.symbolic_target().unwrap_or("refs/heads/master");
                Ok(HeadRef::Unborn {
                    name: target
                        .strip_prefix("refs/heads/")
                        .unwrap_or(target)
                        .to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>, GitError> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn head_tree(&self) -> Result<Option<git2::Tree<'_>>, GitError> {
        match self.head_commit()? {
            Some(commit) => Ok(Some(commit.tree()?)),
            None => Ok(None),
        }
    }

    /// Commit HEAD points at, `None` while HEAD is unborn.
    pub fn head_oid(&self) -> Result<Option<Oid>, GitError> {
        self.head_commit()?.map(|c| to_oid(c.id())).transpose()
    }

    /// Resolve a ref name (`main`, `origin/main`, `v1.0`, `refs/heads/x`) to
    /// the commit it points at.
    ///
    /// # Errors
    ///
    /// [`GitError::RefNotFound`] if nothing by that name exists.
    pub fn resolve_ref(&self, name: &str) -> Result<Oid, GitError> {
        let reference = self
            .repo
            .resolve_reference_from_short_name(name)
            .map_err(|e| GitError::lookup(e, name))?;
        let commit = reference
            .peel_to_commit()
            .map_err(|e| GitError::lookup(e, name))?;
        to_oid(commit.id())
    }

    /// Find a commit by full or abbreviated id (any revspec is accepted).
    pub(super) fn find_commit(&self, id: &str) -> Result<git2::Commit<'_>, GitError> {
        self.repo
            .revparse_single(id)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| GitError::object(e, id))
    }

    // =========================================================================
    // Branches
    // =========================================================================

    /// All local and remote-tracking branches, in engine order.
    ///
    /// Symbolic remote refs such as `origin/HEAD` are skipped.
    pub fn branches(&self) -> Result<Vec<Branch>, GitError> {
        let mut out = Vec::new();
        for entry in self.repo.branches(None)? {
            let (branch, kind) = entry?;
            if branch.get().kind() == Some(git2::ReferenceType::Symbolic) {
                continue;
            }
            let Some(name) = branch.name()? else {
                continue;
            };
            let is_remote = kind == git2::BranchType::Remote;
            out.push(Branch {
                name: name.to_string(),
                is_remote,
                is_head: !is_remote && branch.is_head(),
            });
        }
        Ok(out)
    }

    pub fn local_branch_exists(&self, name: &str) -> bool {
        self.repo.find_branch(name, git2::BranchType::Local).is_ok()
    }

    /// Remote-tracking branches named `<remote>/<name>` across all remotes.
    pub fn remote_branches_named(&self, name: &str) -> Result<Vec<String>, GitError> {
        let mut found = Vec::new();
        for remote in self.remote_names()? {
            let candidate = format!("{remote}/{name}");
            if self
                .repo
                .find_branch(&candidate, git2::BranchType::Remote)
                .is_ok()
            {
                found.push(candidate);
            }
        }
        Ok(found)
    }

    /// Create `name` at HEAD without switching to it.
    pub fn create_branch(&self, name: &BranchName) -> Result<(), GitError> {
        let head = self.head_commit()?.ok_or(GitError::UnbornHead)?;
        self.repo
            .branch(name.as_str(), &head, false)
            .map_err(|e| match e.code() {
                git2::ErrorCode::Exists => GitError::BranchExists {
                    name: name.to_string(),
                },
                git2::ErrorCode::InvalidSpec => GitError::InvalidRefName {
                    message: e.message().to_string(),
                },
                _ => e.into(),
            })?;
        Ok(())
    }

    /// Create local `name` at `remote_branch` and set it as the upstream.
    pub fn create_tracking_branch(
        &self,
        name: &BranchName,
        remote_branch: &str,
    ) -> Result<(), GitError> {
        let remote = self
            .repo
            .find_branch(remote_branch, git2::BranchType::Remote)
            .map_err(|e| GitError::lookup(e, remote_branch))?;
        let commit = remote.get().peel_to_commit()?;
        let mut local = self.repo.branch(name.as_str(), &commit, false)?;
        local.set_upstream(Some(remote_branch))?;
        Ok(())
    }

    pub fn delete_branch(&self, name: &str) -> Result<(), GitError> {
        let mut branch = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .map_err(|e| GitError::lookup(e, name))?;
        branch.delete()?;
        Ok(())
    }

    /// Safely check out local branch `name` and point HEAD at it.
    ///
    /// Local changes to files that differ between HEAD and the target abort
    /// the checkout with [`GitError::CheckoutConflict`]; other local
    /// changes are carried over.
    pub fn checkout_branch(&self, name: &str) -> Result<(), GitError> {
        let refname = format!("refs/heads/{name}");
        let target = self
            .repo
            .find_reference(&refname)
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| GitError::lookup(e, name))?;

        let conflicts = RefCell::new(Vec::new());
        let result = {
            let mut opts = CheckoutBuilder::new();
            opts.safe()
                .notify_on(git2::CheckoutNotificationType::CONFLICT)
                .notify(|_, path, _, _, _| {
                    if let Some(path) = path {
                        conflicts
                            .borrow_mut()
                            .push(path.to_string_lossy().into_owned());
                    }
                    true
                });
            self.repo.checkout_tree(target.as_object(), Some(&mut opts))
        };

        if let Err(e) = result {
            if e.code() == git2::ErrorCode::Conflict {
                return Err(GitError::CheckoutConflict {
                    paths: conflicts.into_inner(),
                });
            }
            return Err(e.into());
        }

        self.repo.set_head(&refname)?;
        Ok(())
    }

    /// Upstream of local branch `name`, if configured.
    pub fn upstream(&self, name: &str) -> Result<Option<Upstream>, GitError> {
        let branch = self
            .repo
            .find_branch(name, git2::BranchType::Local)
            .map_err(|e| GitError::lookup(e, name))?;
        let Some(refname) = branch.get().name() else {
            return Ok(None);
        };

        let remote = match self.repo.branch_upstream_remote(refname) {
            Ok(buf) => buf.as_str().map(str::to_string),
            Err(e) if e.code() == git2::ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        let merge = match self.repo.branch_upstream_merge(refname) {
            Ok(buf) => buf.as_str().map(str::to_string),
            Err(e) if e.code() == git2::ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        Ok(match (remote, merge) {
            (Some(remote), Some(merge)) => Some(Upstream {
                remote,
                branch: merge
                    .strip_prefix("refs/heads/")
                    .unwrap_or(&merge)
                    .to_string(),
            }),
            _ => None,
        })
    }

    pub fn remote_names(&self) -> Result<Vec<String>, GitError> {
        Ok(self
            .repo
            .remotes()?
            .iter()
            .flatten()
            .map(str::to_string)
            .collect())
    }

    // =========================================================================
    // Commits
    // =========================================================================

    pub fn commit(&self, id: &str) -> Result<Commit, GitError> {
        Ok(commit_record(&self.find_commit(id)?))
    }

    /// Every commit reachable from `tip`, with parent links.
    pub fn commit_graph(&self, tip: &Oid) -> Result<Vec<CommitNode>, GitError> {
        let mut walk = self.repo.revwalk()?;
        let start = git2::Oid::from_str(tip.as_str())?;
        walk.push(start)?;

        let mut nodes = Vec::new();
        for id in walk {
            let commit = self.repo.find_commit(id?)?;
            nodes.push(CommitNode {
                id: commit.id().to_string(),
                timestamp: commit.time().seconds(),
                parents: commit.parent_ids().map(|p| p.to_string()).collect(),
            });
        }
        Ok(nodes)
    }

    pub fn merge_base(&self, a: &Oid, b: &Oid) -> Result<Option<Oid>, GitError> {
        let a = git2::Oid::from_str(a.as_str())?;
        let b = git2::Oid::from_str(b.as_str())?;
        match self.repo.merge_base(a, b) {
            Ok(base) => Ok(Some(to_oid(base)?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Paths that differ between two commits' trees (`None` is the empty tree).
    pub fn paths_between(&self, from: Option<&Oid>, to: &Oid) -> Result<Vec<String>, GitError> {
        let old_tree = match from {
            Some(id) => Some(self.find_commit(id.as_str())?.tree()?),
            None => None,
        };
        let new_tree = self.find_commit(to.as_str())?.tree()?;
        let diff = self
            .repo
            .diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), None)?;

        let mut paths = Vec::new();
        for delta in diff.deltas() {
            for file in [delta.old_file(), delta.new_file()] {
                if let Some(path) = file.path() {
                    let path = path.to_string_lossy().into_owned();
                    if !paths.contains(&path) {
                        paths.push(path);
                    }
                }
            }
        }
        Ok(paths)
    }

    // =========================================================================
    // Working tree status
    // =========================================================================

    /// Staged and unstaged status of every changed path, sorted by path.
    ///
    /// Untracked files are included (recursing into untracked directories);
    /// ignored files are not. Rename detection is off.
    pub fn status_entries(&self) -> Result<Vec<StatusEntry>, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .renames_head_to_index(false)
            .renames_index_to_workdir(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut entries: Vec<StatusEntry> = statuses
            .iter()
            .filter_map(|entry| {
                let path = entry.path()?.to_string();
                let s = entry.status();
                let staged = if s.is_index_new() {
                    Some(FileStatus::Added)
                } else if s.is_index_deleted() {
                    Some(FileStatus::Deleted)
                } else if s.is_index_modified() || s.is_index_typechange() || s.is_index_renamed()
                {
                    Some(FileStatus::Modified)
                } else {
                    None
                };
                let unstaged = if s.is_wt_new() {
                    Some(FileStatus::Added)
                } else if s.is_wt_deleted() {
                    Some(FileStatus::Deleted)
                } else if s.is_wt_modified() || s.is_wt_typechange() || s.is_wt_renamed() {
                    Some(FileStatus::Modified)
                } else {
                    None
                };
                let conflicted = s.is_conflicted();
                (staged.is_some() || unstaged.is_some() || conflicted).then_some(StatusEntry {
                    path,
                    staged,
                    unstaged,
                    conflicted,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    // =========================================================================
    // Index and commits
    // =========================================================================

    /// Record the working-tree state of `paths` in the index.
    ///
    /// Paths missing from disk are staged as removals.
    pub fn stage(&self, paths: &[String]) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        for path in paths {
            let rel = Path::new(path);
            if self.work_dir.join(rel).symlink_metadata().is_ok() {
                index.add_path(rel)?;
            } else {
                index.remove_path(rel)?;
            }
        }
        index.write()?;
        Ok(())
    }

    /// Reset the index entries for `paths` to HEAD, leaving the working
    /// tree untouched. With an unborn HEAD the entries are removed.
    pub fn unstage(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let head = self.head_commit()?;
        let target = head.as_ref().map(|c| c.as_object());
        self.repo
            .reset_default(target, paths.iter().map(String::as_str))?;
        Ok(())
    }

    /// Every index entry as it stands now, for [`Git::restore_index`].
    pub fn index_snapshot(&self) -> Result<IndexSnapshot, GitError> {
        Ok(IndexSnapshot(self.repo.index()?.iter().collect()))
    }

    /// Put the index back exactly as `snapshot` recorded it.
    pub fn restore_index(&self, snapshot: IndexSnapshot) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        index.clear()?;
        for entry in &snapshot.0 {
            index.add(entry)?;
        }
        index.write()?;
        Ok(())
    }

    /// True when the index records anything HEAD does not.
    pub fn has_staged_changes(&self) -> Result<bool, GitError> {
        let head_tree = self.head_tree()?;
        let diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), None, None)?;
        Ok(diff.deltas().len() > 0)
    }

    /// Commit the index on top of HEAD and advance HEAD.
    pub fn commit_index(&self, message: &str) -> Result<Oid, GitError> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.signature()?;
        let parent = self.head_commit()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let id = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        to_oid(id)
    }

    fn signature(&self) -> Result<git2::Signature<'static>, GitError> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(_) => Ok(git2::Signature::now("gitpane", "gitpane@localhost")?),
        }
    }

    /// Make the index and working tree match HEAD exactly.
    ///
    /// Staged and unstaged edits are reverted, untracked files are deleted
    /// and any paused merge or rebase state is cleared. An untracked nested
    /// repository is deleted as a whole. Ignored files are kept.
    pub fn discard_all(&self) -> Result<(), GitError> {
        match self.head_commit()? {
            Some(head) => {
                let mut opts = CheckoutBuilder::new();
                opts.force();
                self.repo
                    .reset(head.as_object(), git2::ResetType::Hard, Some(&mut opts))?;
            }
            None => {
                let mut index = self.repo.index()?;
                index.clear()?;
                index.write()?;
            }
        }
        self.remove_untracked()?;
        self.repo.cleanup_state()?;
        Ok(())
    }

    fn remove_untracked(&self) -> Result<(), GitError> {
        let untracked: Vec<String> = self
            .status_entries()?
            .into_iter()
            .filter(StatusEntry::is_untracked)
            .map(|e| e.path)
            .collect();

        for path in untracked {
            // nested repositories are reported as a directory entry
            let full = self.work_dir.join(path.trim_end_matches('/'));
            let removed = match full.symlink_metadata() {
                Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(&full),
                Ok(_) => std::fs::remove_file(&full),
                Err(e) => Err(e),
            };
            match removed {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            let mut dir = full.parent();
            while let Some(d) = dir {
                if d == self.work_dir || std::fs::remove_dir(d).is_err() {
                    break;
                }
                dir = d.parent();
            }
        }
        Ok(())
    }

    // =========================================================================
    // Merge
    // =========================================================================

    /// Merge branch `source` (local or remote-tracking) into HEAD.
    ///
    /// Fast-forwards when possible. Otherwise performs a three-way merge and
    /// commits it; on conflicts the repository is left in the merge state
    /// with conflict markers in the working tree.
    pub fn merge_branch(&self, source: &str) -> Result<MergeOutcome, GitError> {
        let (branch, is_remote) = match self.repo.find_branch(source, git2::BranchType::Local) {
            Ok(b) => (b, false),
            Err(_) => (
                self.repo
                    .find_branch(source, git2::BranchType::Remote)
                    .map_err(|e| GitError::lookup(e, source))?,
                true,
            ),
        };
        let reference = branch.into_reference();
        let annotated = self.repo.reference_to_annotated_commit(&reference)?;
        let (analysis, _) = self.repo.merge_analysis(&[&annotated])?;

        if analysis.is_up_to_date() {
            return Ok(MergeOutcome::UpToDate);
        }

        let target = self.repo.find_commit(annotated.id())?;
        if analysis.is_fast_forward() {
            let mut opts = CheckoutBuilder::new();
            opts.safe();
            self.repo.checkout_tree(target.as_object(), Some(&mut opts))?;

            let log = format!("merge {source}: Fast-forward");
            match self.repo.head() {
                Ok(mut head) => {
                    head.set_target(target.id(), &log)?;
                }
                Err(_) => {
                    let head = self.repo.find_reference("HEAD")?;
                    let name = head.symbolic_target().unwrap_or("refs/heads/master");
                    self.repo.reference(name, target.id(), false, &log)?;
                }
            }
            return Ok(MergeOutcome::FastForward(to_oid(target.id())?));
        }

        let mut opts = CheckoutBuilder::new();
        opts.safe();
        self.repo.merge(&[&annotated], None, Some(&mut opts))?;

        let mut index = self.repo.index()?;
        if index.has_conflicts() {
            let mut paths: Vec<String> = index
                .conflicts()?
                .filter_map(Result::ok)
                .filter_map(|c| c.our.or(c.their).or(c.ancestor))
                .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
                .collect();
            paths.sort();
            paths.dedup();
            return Ok(MergeOutcome::Conflicts(paths));
        }

        let tree = self.repo.find_tree(index.write_tree()?)?;
        let head = self.head_commit()?.ok_or(GitError::UnbornHead)?;
        let current = self.head()?;
        let kind = if is_remote { "remote-tracking branch" } else { "branch" };
        let message = format!(
            "Merge {kind} '{source}' into {}",
            current.branch_name().unwrap_or("HEAD")
        );
        let signature = self.signature()?;
        let id = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&head, &target],
        )?;
        self.repo.cleanup_state()?;
        Ok(MergeOutcome::Merged(to_oid(id)?))
    }
}
