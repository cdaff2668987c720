//! ops::remote
//!
//! Preconditions for push, fetch and pull.
//!
//! The network calls themselves are async and run outside the repository
//! lock window; what they need from the repository (which remote, which
//! branch pair, whether the tree is clean enough) is read here first.

use crate::core::error::CoreError;
use crate::core::model::HeadRef;
use crate::git::{Git, RemoteTarget};

/// Pick the remote to talk to when no upstream names one.
///
/// `preferred` wins if it exists; otherwise a sole remote is used.
fn choose_remote(git: &Git, preferred: &str) -> Result<String, CoreError> {
    let names = git.remote_names()?;
    if names.iter().any(|n| n == preferred) {
        return Ok(preferred.to_string());
    }
    match names.as_slice() {
        [only] => Ok(only.clone()),
        _ => Err(CoreError::NoRemote),
    }
}

fn current_target(git: &Git, preferred: &str) -> Result<RemoteTarget, CoreError> {
    let branch = match git.head()? {
        HeadRef::Branch { name } => name,
        HeadRef::Detached { .. } => return Err(CoreError::DetachedHead),
        HeadRef::Unborn { .. } => {
            return Err(CoreError::UnknownRef {
                name: "HEAD".to_string(),
            })
        }
    };

    if let Some(upstream) = git.upstream(&branch)? {
        return Ok(RemoteTarget {
            remote: upstream.remote,
            local_branch: branch,
            remote_branch: upstream.branch,
            has_upstream: true,
        });
    }

    Ok(RemoteTarget {
        remote: choose_remote(git, preferred)?,
        remote_branch: branch.clone(),
        local_branch: branch,
        has_upstream: false,
    })
}

/// Branch pair for pushing the checked-out branch.
pub fn push_target(git: &Git, preferred: &str) -> Result<RemoteTarget, CoreError> {
    current_target(git, preferred)
}

/// Branch pair for pulling into the checked-out branch.
///
/// Pull rebases, so tracked files must be clean. Untracked files are left
/// alone unless the incoming commits collide with them, which git reports
/// itself.
pub fn pull_target(git: &Git, preferred: &str) -> Result<RemoteTarget, CoreError> {
    git.ensure_no_operation()?;
    let target = current_target(git, preferred)?;

    let dirty: Vec<String> = git
        .status_entries()?
        .into_iter()
        .filter(|e| {
            e.staged.is_some() || e.conflicted || (e.unstaged.is_some() && !e.is_untracked())
        })
        .map(|e| e.path)
        .collect();
    if !dirty.is_empty() {
        return Err(CoreError::UncommittedChangesBlocking { paths: dirty });
    }
    Ok(target)
}

/// Remote to fetch from: the current branch's upstream remote, else the
/// preferred one.
pub fn fetch_remote(git: &Git, preferred: &str) -> Result<String, CoreError> {
    if let HeadRef::Branch { name } = git.head()? {
        if let Some(upstream) = git.upstream(&name)? {
            return Ok(upstream.remote);
        }
    }
    choose_remote(git, preferred)
}
