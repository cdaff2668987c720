//! core::ops
//!
//! Locking for mutating commands.
//!
//! # Architecture
//!
//! Every mutating command:
//! 1. Waits for the in-process handle lock
//! 2. Acquires the cross-process [`RepoLock`] under the git dir
//! 3. Runs its mutation
//! 4. Releases both locks, in reverse order, on return
//!
//! Reads take only the in-process lock.

pub mod lock;

pub use lock::{LockError, RepoLock};
