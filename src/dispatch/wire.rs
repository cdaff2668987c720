//! dispatch::wire
//!
//! JSON request and response shapes.
//!
//! # Requests
//!
//! A request is an object tagged by `command`. Arguments use snake_case
//! names; the camelCase spellings a desktop frontend tends to send
//! (`branchName`, `commitHash`, `commitMessage`) are accepted as aliases.
//! `request_id` is optional and echoed back unchanged.
//!
//! ```json
//! {"command": "switch_branch", "directory": "/r", "branch_name": "main", "request_id": "4"}
//! ```
//!
//! # Responses
//!
//! ```json
//! {"request_id": "4", "ok": true, "data": null}
//! {"request_id": "5", "ok": false,
//!  "error": {"kind": "unknown_branch", "message": "unknown branch: x"}}
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{CoreError, ErrorKind};

/// One command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, alias = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub command: Command,
}

/// Every command the dispatcher understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    OpenRepository {
        directory: PathBuf,
    },
    CloseRepository {
        directory: PathBuf,
    },

    // Branches
    GetBranchList {
        directory: PathBuf,
    },
    GetHead {
        directory: PathBuf,
    },
    ResolveRef {
        directory: PathBuf,
        #[serde(alias = "refName")]
        ref_name: String,
    },
    CreateNewBranch {
        directory: PathBuf,
        #[serde(alias = "branchName")]
        branch_name: String,
    },
    SwitchBranch {
        directory: PathBuf,
        #[serde(alias = "branchName")]
        branch_name: String,
    },
    MergeWithCurrentBranch {
        directory: PathBuf,
        #[serde(alias = "branchName")]
        branch_name: String,
    },
    DeleteBranch {
        directory: PathBuf,
        #[serde(alias = "branchName")]
        branch_name: String,
    },

    // History
    GetAllCommitsFromBranch {
        directory: PathBuf,
        branch: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    GetCommitChanges {
        directory: PathBuf,
        #[serde(alias = "commitId", alias = "commit_hash", alias = "commitHash")]
        commit_id: String,
    },
    GetChangedFilesInCommit {
        directory: PathBuf,
        #[serde(alias = "commitHash", alias = "commit_id", alias = "commitId")]
        commit_hash: String,
    },
    GetCommitDetails {
        directory: PathBuf,
        #[serde(alias = "commitId", alias = "commit_hash", alias = "commitHash")]
        commit_id: String,
    },

    // Diffs
    GetDiffOfFileInCommit {
        directory: PathBuf,
        #[serde(alias = "commitHash", alias = "commit_id", alias = "commitId")]
        commit_hash: String,
        filename: String,
    },
    GetDiffOfFileBetweenCommits {
        directory: PathBuf,
        #[serde(alias = "fromCommit")]
        from_commit: String,
        #[serde(alias = "toCommit")]
        to_commit: String,
        filename: String,
    },
    GetDiffOfFile {
        directory: PathBuf,
        filename: String,
    },
    GetStagedDiffOfFile {
        directory: PathBuf,
        filename: String,
    },
    GetUnstagedDiffOfFile {
        directory: PathBuf,
        filename: String,
    },

    // Status
    #[serde(alias = "get_all_changed_files")]
    GetCurrentChangesStatus {
        directory: PathBuf,
    },
    GetStagedChanges {
        directory: PathBuf,
    },
    GetUnstagedChanges {
        directory: PathBuf,
    },
    GetStatusFingerprint {
        directory: PathBuf,
    },
    GetRepoState {
        directory: PathBuf,
    },

    // Working tree
    GitAddAndCommit {
        directory: PathBuf,
        #[serde(alias = "commitMessage")]
        commit_message: String,
        files: Vec<String>,
    },
    StageChanges {
        directory: PathBuf,
        files: Vec<String>,
    },
    UnstageChanges {
        directory: PathBuf,
        files: Vec<String>,
    },
    CommitChanges {
        directory: PathBuf,
        #[serde(alias = "commitMessage")]
        commit_message: String,
    },
    DiscardChanges {
        directory: PathBuf,
    },

    // Network
    PushCurrentBranch {
        directory: PathBuf,
    },
    Fetch {
        directory: PathBuf,
    },
    Pull {
        directory: PathBuf,
    },
    /// Cancel the network command whose `request_id` is `target`.
    Cancel {
        target: String,
    },
}

impl Command {
    /// The wire name, as it appears in the `command` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Command::OpenRepository { .. } => "open_repository",
            Command::CloseRepository { .. } => "close_repository",
            Command::GetBranchList { .. } => "get_branch_list",
            Command::GetHead { .. } => "get_head",
            Command::ResolveRef { .. } => "resolve_ref",
            Command::CreateNewBranch { .. } => "create_new_branch",
            Command::SwitchBranch { .. } => "switch_branch",
            Command::MergeWithCurrentBranch { .. } => "merge_with_current_branch",
            Command::DeleteBranch { .. } => "delete_branch",
            Command::GetAllCommitsFromBranch { .. } => "get_all_commits_from_branch",
            Command::GetCommitChanges { .. } => "get_commit_changes",
            Command::GetChangedFilesInCommit { .. } => "get_changed_files_in_commit",
            Command::GetCommitDetails { .. } => "get_commit_details",
            Command::GetDiffOfFileInCommit { .. } => "get_diff_of_file_in_commit",
            Command::GetDiffOfFileBetweenCommits { .. } => "get_diff_of_file_between_commits",
            Command::GetDiffOfFile { .. } => "get_diff_of_file",
            Command::GetStagedDiffOfFile { .. } => "get_staged_diff_of_file",
            Command::GetUnstagedDiffOfFile { .. } => "get_unstaged_diff_of_file",
            Command::GetCurrentChangesStatus { .. } => "get_current_changes_status",
            Command::GetStagedChanges { .. } => "get_staged_changes",
            Command::GetUnstagedChanges { .. } => "get_unstaged_changes",
            Command::GetStatusFingerprint { .. } => "get_status_fingerprint",
            Command::GetRepoState { .. } => "get_repo_state",
            Command::GitAddAndCommit { .. } => "git_add_and_commit",
            Command::StageChanges { .. } => "stage_changes",
            Command::UnstageChanges { .. } => "unstage_changes",
            Command::CommitChanges { .. } => "commit_changes",
            Command::DiscardChanges { .. } => "discard_changes",
            Command::PushCurrentBranch { .. } => "push_current_branch",
            Command::Fetch { .. } => "fetch",
            Command::Pull { .. } => "pull",
            Command::Cancel { .. } => "cancel",
        }
    }

    /// The repository the command targets, if any.
    pub fn directory(&self) -> Option<&Path> {
        match self {
            Command::OpenRepository { directory }
            | Command::CloseRepository { directory }
            | Command::GetBranchList { directory }
            | Command::GetHead { directory }
            | Command::ResolveRef { directory, .. }
            | Command::CreateNewBranch { directory, .. }
            | Command::SwitchBranch { directory, .. }
            | Command::MergeWithCurrentBranch { directory, .. }
            | Command::DeleteBranch { directory, .. }
            | Command::GetAllCommitsFromBranch { directory, .. }
            | Command::GetCommitChanges { directory, .. }
            | Command::GetChangedFilesInCommit { directory, .. }
            | Command::GetCommitDetails { directory, .. }
            | Command::GetDiffOfFileInCommit { directory, .. }
            | Command::GetDiffOfFileBetweenCommits { directory, .. }
            | Command::GetDiffOfFile { directory, .. }
            | Command::GetStagedDiffOfFile { directory, .. }
            | Command::GetUnstagedDiffOfFile { directory, .. }
            | Command::GetCurrentChangesStatus { directory }
            | Command::GetStagedChanges { directory }
            | Command::GetUnstagedChanges { directory }
            | Command::GetStatusFingerprint { directory }
            | Command::GetRepoState { directory }
            | Command::GitAddAndCommit { directory, .. }
            | Command::StageChanges { directory, .. }
            | Command::UnstageChanges { directory, .. }
            | Command::CommitChanges { directory, .. }
            | Command::DiscardChanges { directory }
            | Command::PushCurrentBranch { directory }
            | Command::Fetch { directory }
            | Command::Pull { directory } => Some(directory),
            Command::Cancel { .. } => None,
        }
    }
}

/// Error payload of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CoreError> for WireError {
    fn from(err: &CoreError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// One command result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub request_id: Option<String>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl Response {
    pub fn success(request_id: Option<String>, data: Value) -> Self {
        Self {
            request_id,
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(request_id: Option<String>, err: &CoreError) -> Self {
        Self {
            request_id,
            ok: false,
            data: None,
            error: Some(err.into()),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
