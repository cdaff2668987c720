//! core::error
//!
//! The error taxonomy every command reports.
//!
//! # Design
//!
//! [`CoreError`] is what components return and what the dispatcher
//! serializes. Each variant maps to exactly one [`ErrorKind`], the stable
//! snake_case tag a caller branches on. Messages are for humans; kinds are
//! for code.
//!
//! `CoreError` is `Clone` so one result can be handed to every poller that
//! coalesced onto the same status read.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::git::{GitCliError, GitError};

use super::types::TypeError;

/// Stable machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotARepository,
    PathNotFound,
    UnknownRef,
    UnknownBranch,
    UnknownCommit,
    BranchAlreadyExists,
    InvalidBranchName,
    CannotDeleteHead,
    UncommittedChangesBlocking,
    MergeConflict,
    EmptyCommitMessage,
    NoFilesSelected,
    NothingToCommit,
    FileNotInCommit,
    FileNotChanged,
    AuthenticationRequired,
    RemoteUnreachable,
    NonFastForward,
    PushDeclined,
    BinaryFile,
    LockContention,
    NoRemote,
    DetachedHead,
    OperationInProgress,
    Cancelled,
    InvalidRequest,
    Internal,
}

impl ErrorKind {
    /// Wire name, identical to the serde tag.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotARepository => "not_a_repository",
            ErrorKind::PathNotFound => "path_not_found",
            ErrorKind::UnknownRef => "unknown_ref",
            ErrorKind::UnknownBranch => "unknown_branch",
            ErrorKind::UnknownCommit => "unknown_commit",
            ErrorKind::BranchAlreadyExists => "branch_already_exists",
            ErrorKind::InvalidBranchName => "invalid_branch_name",
            ErrorKind::CannotDeleteHead => "cannot_delete_head",
            ErrorKind::UncommittedChangesBlocking => "uncommitted_changes_blocking",
            ErrorKind::MergeConflict => "merge_conflict",
            ErrorKind::EmptyCommitMessage => "empty_commit_message",
            ErrorKind::NoFilesSelected => "no_files_selected",
            ErrorKind::NothingToCommit => "nothing_to_commit",
            ErrorKind::FileNotInCommit => "file_not_in_commit",
            ErrorKind::FileNotChanged => "file_not_changed",
            ErrorKind::AuthenticationRequired => "authentication_required",
            ErrorKind::RemoteUnreachable => "remote_unreachable",
            ErrorKind::NonFastForward => "non_fast_forward",
            ErrorKind::PushDeclined => "push_declined",
            ErrorKind::BinaryFile => "binary_file",
            ErrorKind::LockContention => "lock_contention",
            ErrorKind::NoRemote => "no_remote",
            ErrorKind::DetachedHead => "detached_head",
            ErrorKind::OperationInProgress => "operation_in_progress",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by every component and command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("not a git repository: {}", path.display())]
    NotARepository { path: PathBuf },

    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    #[error("unknown ref: {name}")]
    UnknownRef { name: String },

    #[error("unknown branch: {name}")]
    UnknownBranch { name: String },

    #[error("unknown commit: {id}")]
    UnknownCommit { id: String },

    #[error("branch already exists: {name}")]
    BranchAlreadyExists { name: String },

    #[error("{message}")]
    InvalidBranchName { message: String },

    #[error("cannot delete the checked-out branch: {name}")]
    CannotDeleteHead { name: String },

    #[error("uncommitted changes would be overwritten: {}", paths.join(", "))]
    UncommittedChangesBlocking { paths: Vec<String> },

    #[error("merge conflict in: {}", paths.join(", "))]
    MergeConflict { paths: Vec<String> },

    #[error("commit message cannot be empty")]
    EmptyCommitMessage,

    #[error("no files selected")]
    NoFilesSelected,

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("{path} has no change in commit {commit}")]
    FileNotInCommit { commit: String, path: String },

    #[error("{path} has no uncommitted change")]
    FileNotChanged { path: String },

    #[error("authentication required: {message}")]
    AuthenticationRequired { message: String },

    #[error("remote unreachable: {message}")]
    RemoteUnreachable { message: String },

    #[error("push rejected (non-fast-forward): {message}")]
    NonFastForward { message: String },

    #[error("push declined by the remote: {message}")]
    PushDeclined { message: String },

    #[error("binary file: {path}")]
    BinaryFile { path: String },

    #[error("another operation holds the repository lock: {}", path.display())]
    LockContention { path: PathBuf },

    #[error("no remote configured")]
    NoRemote,

    #[error("HEAD is detached")]
    DetachedHead,

    #[error("{operation} in progress")]
    OperationInProgress { operation: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("{message}")]
    Internal { message: String },
}

impl CoreError {
    /// The stable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotARepository { .. } => ErrorKind::NotARepository,
            CoreError::PathNotFound { .. } => ErrorKind::PathNotFound,
            CoreError::UnknownRef { .. } => ErrorKind::UnknownRef,
            CoreError::UnknownBranch { .. } => ErrorKind::UnknownBranch,
            CoreError::UnknownCommit { .. } => ErrorKind::UnknownCommit,
            CoreError::BranchAlreadyExists { .. } => ErrorKind::BranchAlreadyExists,
            CoreError::InvalidBranchName { .. } => ErrorKind::InvalidBranchName,
            CoreError::CannotDeleteHead { .. } => ErrorKind::CannotDeleteHead,
            CoreError::UncommittedChangesBlocking { .. } => ErrorKind::UncommittedChangesBlocking,
            CoreError::MergeConflict { .. } => ErrorKind::MergeConflict,
            CoreError::EmptyCommitMessage => ErrorKind::EmptyCommitMessage,
            CoreError::NoFilesSelected => ErrorKind::NoFilesSelected,
            CoreError::NothingToCommit => ErrorKind::NothingToCommit,
            CoreError::FileNotInCommit { .. } => ErrorKind::FileNotInCommit,
            CoreError::FileNotChanged { .. } => ErrorKind::FileNotChanged,
            CoreError::AuthenticationRequired { .. } => ErrorKind::AuthenticationRequired,
            CoreError::RemoteUnreachable { .. } => ErrorKind::RemoteUnreachable,
            CoreError::NonFastForward { .. } => ErrorKind::NonFastForward,
            CoreError::PushDeclined { .. } => ErrorKind::PushDeclined,
            CoreError::BinaryFile { .. } => ErrorKind::BinaryFile,
            CoreError::LockContention { .. } => ErrorKind::LockContention,
            CoreError::NoRemote => ErrorKind::NoRemote,
            CoreError::DetachedHead => ErrorKind::DetachedHead,
            CoreError::OperationInProgress { .. } => ErrorKind::OperationInProgress,
            CoreError::Cancelled => ErrorKind::Cancelled,
            CoreError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            CoreError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Shorthand for [`CoreError::Internal`].
    pub fn internal(message: impl std::fmt::Display) -> Self {
        CoreError::Internal {
            message: message.to_string(),
        }
    }

    /// True when the cached handle for the path should be dropped.
    pub fn invalidates_handle(&self) -> bool {
        matches!(
            self,
            CoreError::NotARepository { .. } | CoreError::PathNotFound { .. }
        )
    }
}

impl From<TypeError> for CoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidBranchName(message) => CoreError::InvalidBranchName { message },
            TypeError::InvalidOid(id) => CoreError::UnknownCommit { id },
        }
    }
}

/// Default mapping. Components re-map not-found cases where the context
/// says whether a branch or a commit was meant.
impl From<GitError> for CoreError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::NotARepo { path } => CoreError::NotARepository { path },
            GitError::PathNotFound { path } => CoreError::PathNotFound { path },
            GitError::BareRepo { path } => CoreError::NotARepository { path },
            GitError::RefNotFound { refname } => CoreError::UnknownRef { name: refname },
            GitError::ObjectNotFound { oid } => CoreError::UnknownCommit { id: oid },
            GitError::BranchExists { name } => CoreError::BranchAlreadyExists { name },
            GitError::InvalidRefName { message } => CoreError::InvalidBranchName { message },
            GitError::CheckoutConflict { paths } => CoreError::UncommittedChangesBlocking { paths },
            GitError::OperationInProgress { operation } => CoreError::OperationInProgress {
                operation: operation.to_string(),
            },
            GitError::UnbornHead => CoreError::UnknownRef {
                name: "HEAD".to_string(),
            },
            GitError::Io { message } | GitError::Internal { message } => {
                CoreError::Internal { message }
            }
        }
    }
}

impl From<GitCliError> for CoreError {
    fn from(err: GitCliError) -> Self {
        match err {
            GitCliError::AuthFailed(message) => CoreError::AuthenticationRequired { message },
            GitCliError::PushRejected(message) => CoreError::NonFastForward { message },
            GitCliError::Unreachable(message) => CoreError::RemoteUnreachable { message },
            GitCliError::TimedOut(after) => CoreError::RemoteUnreachable {
                message: format!("no response after {}s", after.as_secs()),
            },
            GitCliError::RemoteDeclined(message) => CoreError::PushDeclined { message },
            GitCliError::RemoteRefNotFound(name) => CoreError::UnknownRef { name },
            GitCliError::RebaseConflict(paths) => CoreError::MergeConflict { paths },
            GitCliError::Cancelled => CoreError::Cancelled,
            GitCliError::NotAvailable | GitCliError::CommandFailed(_) => CoreError::internal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_serde_tag() {
        for kind in [
            ErrorKind::NotARepository,
            ErrorKind::UncommittedChangesBlocking,
            ErrorKind::LockContention,
            ErrorKind::NonFastForward,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn invalid_branch_name_from_type_error() {
        let err: CoreError = TypeError::InvalidBranchName("bad".into()).into();
        assert_eq!(err.kind(), ErrorKind::InvalidBranchName);
    }

    #[test]
    fn git_not_found_maps_to_unknown_ref() {
        let err: CoreError = GitError::RefNotFound {
            refname: "refs/heads/x".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::UnknownRef);
    }

    #[test]
    fn network_timeout_is_unreachable() {
        let err: CoreError = GitCliError::TimedOut(std::time::Duration::from_secs(120)).into();
        assert_eq!(err.kind(), ErrorKind::RemoteUnreachable);
        assert!(err.to_string().contains("120s"));
    }

    #[test]
    fn missing_remote_ref_names_the_ref() {
        let err: CoreError = GitCliError::RemoteRefNotFound("feature".into()).into();
        assert_eq!(err, CoreError::UnknownRef { name: "feature".into() });
    }

    #[test]
    fn declined_push_is_not_non_fast_forward() {
        let err: CoreError = GitCliError::RemoteDeclined("pre-receive hook declined".into()).into();
        assert_eq!(err.kind(), ErrorKind::PushDeclined);
    }

    #[test]
    fn display_lists_paths() {
        let err = CoreError::MergeConflict {
            paths: vec!["a.txt".into(), "b.txt".into()],
        };
        assert_eq!(err.to_string(), "merge conflict in: a.txt, b.txt");
    }

    #[test]
    fn only_location_errors_invalidate() {
        assert!(CoreError::PathNotFound { path: "/x".into() }.invalidates_handle());
        assert!(!CoreError::NothingToCommit.invalidates_handle());
    }
}
