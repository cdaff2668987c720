//! dispatch
//!
//! The request/response boundary.
//!
//! # Architecture
//!
//! [`Dispatcher`] turns one [`Request`] into one [`Response`]. It parses,
//! runs the command on the [`Engine`] inside a tracing span, and
//! serializes the result. Nothing escapes as a panic or a transport error:
//! malformed input becomes an `invalid_request` response and every
//! [`CoreError`] becomes `{kind, message}`.
//!
//! Results keep the shapes defined in `core::model`; diff commands return
//! the unified diff text as a plain JSON string.
//!
//! # Invariants
//!
//! - Exactly one response per request, carrying the request's id
//! - A failed command leaves the cached handle usable, except when the
//!   repository itself is gone; that handle is evicted so the next request
//!   reopens from scratch

pub mod wire;

pub use wire::{Command, Request, Response, WireError};

use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::core::error::CoreError;
use crate::engine::Engine;

fn to_value<T: Serialize>(value: T) -> Result<Value, CoreError> {
    serde_json::to_value(value).map_err(CoreError::internal)
}

/// Routes wire requests to the engine.
#[derive(Debug)]
pub struct Dispatcher {
    engine: Engine,
}

impl Dispatcher {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Parse and dispatch one JSON request.
    pub async fn dispatch_json(&self, line: &str) -> Response {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.dispatch(request).await,
            Err(err) => {
                let request_id = serde_json::from_str::<Value>(line).ok().and_then(|v| {
                    v.get("request_id")
                        .or_else(|| v.get("requestId"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                });
                let err = CoreError::InvalidRequest {
                    message: err.to_string(),
                };
                tracing::warn!(kind = %err.kind(), "{err}");
                Response::failure(request_id, &err)
            }
        }
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        let Request {
            request_id,
            command,
        } = request;
        let span = tracing::info_span!(
            "command",
            op = command.name(),
            dir = command.directory().map(|d| d.display().to_string()).unwrap_or_default(),
        );

        async {
            let directory = command.directory().map(|d| d.to_path_buf());
            match self.execute(command, request_id.as_deref()).await {
                Ok(data) => Response::success(request_id, data),
                Err(err) => {
                    tracing::warn!(kind = %err.kind(), "{err}");
                    if err.invalidates_handle() {
                        if let Some(dir) = directory {
                            self.engine.close_repository(&dir);
                        }
                    }
                    Response::failure(request_id, &err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        command: Command,
        request_id: Option<&str>,
    ) -> Result<Value, CoreError> {
        let engine = &self.engine;
        match command {
            Command::OpenRepository { directory } => {
                to_value(engine.open_repository(&directory).await?)
            }
            Command::CloseRepository { directory } => to_value(engine.close_repository(&directory)),

            Command::GetBranchList { directory } => {
                to_value(engine.list_branches(&directory).await?)
            }
            Command::GetHead { directory } => to_value(engine.head(&directory).await?),
            Command::ResolveRef {
                directory,
                ref_name,
            } => to_value(engine.resolve_ref(&directory, &ref_name).await?),
            Command::CreateNewBranch {
                directory,
                branch_name,
            } => to_value(engine.create_branch(&directory, &branch_name).await?),
            Command::SwitchBranch {
                directory,
                branch_name,
            } => to_value(engine.switch_branch(&directory, &branch_name).await?),
            Command::MergeWithCurrentBranch {
                directory,
                branch_name,
            } => to_value(engine.merge_branch(&directory, &branch_name).await?),
            Command::DeleteBranch {
                directory,
                branch_name,
            } => to_value(engine.delete_branch(&directory, &branch_name).await?),

            Command::GetAllCommitsFromBranch {
                directory,
                branch,
                limit,
            } => to_value(engine.list_commits(&directory, &branch, limit).await?),
            Command::GetCommitChanges {
                directory,
                commit_id,
            } => to_value(engine.get_commit(&directory, &commit_id).await?),
            Command::GetChangedFilesInCommit {
                directory,
                commit_hash,
            } => to_value(engine.changed_files(&directory, &commit_hash).await?),
            Command::GetCommitDetails {
                directory,
                commit_id,
            } => to_value(engine.commit_details(&directory, &commit_id).await?),

            Command::GetDiffOfFileInCommit {
                directory,
                commit_hash,
                filename,
            } => to_value(
                engine
                    .diff_file_in_commit(&directory, &commit_hash, &filename)
                    .await?
                    .text,
            ),
            Command::GetDiffOfFileBetweenCommits {
                directory,
                from_commit,
                to_commit,
                filename,
            } => to_value(
                engine
                    .diff_file_between(&directory, &from_commit, &to_commit, &filename)
                    .await?
                    .text,
            ),
            Command::GetDiffOfFile {
                directory,
                filename,
            } => to_value(engine.diff_working_tree_file(&directory, &filename).await?.text),
            Command::GetStagedDiffOfFile {
                directory,
                filename,
            } => to_value(engine.diff_staged_file(&directory, &filename).await?.text),
            Command::GetUnstagedDiffOfFile {
                directory,
                filename,
            } => to_value(engine.diff_unstaged_file(&directory, &filename).await?.text),

            Command::GetCurrentChangesStatus { directory } => {
                to_value(engine.status(&directory).await?)
            }
            Command::GetStagedChanges { directory } => {
                to_value(engine.staged_changes(&directory).await?)
            }
            Command::GetUnstagedChanges { directory } => {
                to_value(engine.unstaged_changes(&directory).await?)
            }
            Command::GetStatusFingerprint { directory } => {
                to_value(engine.status_fingerprint(&directory).await?)
            }
            Command::GetRepoState { directory } => to_value(engine.repo_state(&directory).await?),

            Command::GitAddAndCommit {
                directory,
                commit_message,
                files,
            } => to_value(
                engine
                    .stage_and_commit(&directory, &commit_message, files)
                    .await?,
            ),
            Command::StageChanges { directory, files } => {
                to_value(engine.stage(&directory, files).await?)
            }
            Command::UnstageChanges { directory, files } => {
                to_value(engine.unstage(&directory, files).await?)
            }
            Command::CommitChanges {
                directory,
                commit_message,
            } => to_value(engine.commit_staged(&directory, &commit_message).await?),
            Command::DiscardChanges { directory } => {
                to_value(engine.discard_changes(&directory).await?)
            }

            Command::PushCurrentBranch { directory } => {
                to_value(engine.push(&directory, request_id).await?)
            }
            Command::Fetch { directory } => to_value(engine.fetch(&directory, request_id).await?),
            Command::Pull { directory } => to_value(engine.pull(&directory, request_id).await?),
            Command::Cancel { target } => to_value(engine.cancel(&target)),
        }
    }
}
