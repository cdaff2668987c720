//! core
//!
//! Domain types, configuration, errors and locking for gitpane.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, Fingerprint
//! - [`model`] - Branches, commits, change-sets and HEAD state
//! - [`error`] - The error taxonomy every command reports
//! - [`config`] - Configuration schema and loading
//! - [`ops`] - Cross-process repository locking
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing here touches a repository; that is the `git` module's job

pub mod config;
pub mod error;
pub mod model;
pub mod ops;
pub mod types;
