//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Calls the engine (directly, or through the JSON dispatcher)
//! 2. Formats and prints the result
//!
//! Handlers never open repositories themselves.

mod completion;
mod exec;
mod inspect;
mod serve;

pub use completion::completion;
pub use exec::exec;
pub use inspect::{branches, diff, log, status, DiffTarget};
pub use serve::serve;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use super::args::Command;
use crate::dispatch::Dispatcher;
use crate::engine::Engine;

/// Route a parsed command to its handler.
pub async fn dispatch(command: Command, dir: &Path, engine: Engine) -> Result<ExitCode> {
    match command {
        Command::Serve => serve(Dispatcher::new(engine)).await,
        Command::Exec { request } => exec(&Dispatcher::new(engine), &request).await,
        Command::Branches { json } => branches(&engine, dir, json).await,
        Command::Log {
            branch,
            limit,
            json,
        } => log(&engine, dir, branch.as_deref(), limit, json).await,
        Command::Status { json } => status(&engine, dir, json).await,
        Command::Diff {
            path,
            commit,
            staged,
            unstaged,
        } => {
            let target = match (commit, staged, unstaged) {
                (Some(commit), _, _) => DiffTarget::Commit(commit),
                (None, true, _) => DiffTarget::Staged,
                (None, false, true) => DiffTarget::Unstaged,
                (None, false, false) => DiffTarget::WorkingTree,
            };
            diff(&engine, dir, &path, target).await
        }
        Command::Completion { shell } => {
            completion(shell)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
