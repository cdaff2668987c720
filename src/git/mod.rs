//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. It is the only module that
//! imports `git2` and the only one that runs the `git` executable. Every
//! repository read and write elsewhere in the crate flows through [`Git`]
//! or [`Transport`].
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - HEAD, ref and branch operations
//! - Commit lookup and history graph extraction
//! - Working-tree status, index updates and commits
//! - Per-file patches for commits and uncommitted changes
//! - Push, fetch and pull through the `git` executable
//!
//! # Invariants
//!
//! - No other module calls git2 directly
//! - Results are crate types, never git2 objects
//! - Checkouts are safe: local changes are never overwritten silently

mod cli;
mod diff;
mod interface;
mod transport;

pub use cli::{classify_cli_error, GitCli, GitCliError};
pub use diff::{DiffSettings, FilePatch, Hunk, PatchLine, WorktreeSide};
pub use interface::{Git, GitError, GitState, IndexSnapshot, MergeOutcome, StatusEntry, Upstream};
pub use transport::{GitCliTransport, RemoteTarget, Transport};
