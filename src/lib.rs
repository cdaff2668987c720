//! gitpane - Git repository access core
//!
//! gitpane reads and mutates local Git repositories (branches, commit
//! history, working-tree status, per-file diffs, commits, push/fetch/pull)
//! and exposes all of it through a JSON request/response command surface
//! meant to sit underneath a desktop or terminal frontend.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`dispatch`] - JSON wire format and command routing
//! - [`engine`] - Handle registry, per-repository locking, polling, cancellation
//! - [`ops`] - Branch, history, diff, status and working-tree components
//! - [`core`] - Domain types, errors, configuration and locking
//! - [`git`] - Single interface for all Git operations
//!
//! # Correctness Invariants
//!
//! gitpane maintains the following invariants:
//!
//! 1. Operations on one repository are serialized; a read never observes a
//!    half-finished mutation
//! 2. Only the `git` module talks to Git
//! 3. Local changes are never overwritten by a checkout or merge
//! 4. Every failure reaches the caller as a typed error with a stable kind

pub mod cli;
pub mod core;
pub mod dispatch;
pub mod engine;
pub mod git;
pub mod ops;
