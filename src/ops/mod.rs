//! ops
//!
//! The repository components: branches, history, diffs, status and
//! working-tree mutation.
//!
//! # Architecture
//!
//! Each component borrows an open [`Git`](crate::git::Git) and exposes
//! synchronous operations returning [`CoreError`](crate::core::error::CoreError).
//! Components hold no state of their own; the engine decides when they run
//! and under which lock.
//!
//! ```text
//! engine ──► ops::{branches, history, diff, status, worktree, remote} ──► git
//! ```

pub mod branches;
pub mod diff;
pub mod history;
pub mod remote;
pub mod status;
pub mod worktree;

pub use branches::BranchManager;
pub use diff::{render_unified, DiffEngine};
pub use history::{date_order, HistoryWalker};
pub use status::StatusReader;
pub use worktree::WorktreeMutator;
