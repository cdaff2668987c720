//! engine::remote
//!
//! Push, fetch and pull with cancellation.
//!
//! Each network command may carry a request id. While it runs, the id maps
//! to a [`CancellationToken`] in the [`CancelRegistry`]; cancelling the id
//! kills the underlying git process and the command fails with
//! [`CoreError::Cancelled`]. The configured network timeout applies
//! regardless and surfaces as [`CoreError::RemoteUnreachable`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::core::error::CoreError;
use crate::ops::remote::{fetch_remote, pull_target, push_target};

use super::Engine;

/// In-flight network operations by request id.
#[derive(Debug, Default)]
pub struct CancelRegistry {
    next: AtomicU64,
    tokens: Mutex<HashMap<String, (u64, CancellationToken)>>,
}

/// Keeps a token registered until dropped.
#[derive(Debug)]
pub struct CancelGuard<'a> {
    registry: &'a CancelRegistry,
    entry: Option<(String, u64)>,
    token: CancellationToken,
}

impl CancelGuard<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for CancelGuard<'_> {
    fn drop(&mut self) {
        if let Some((id, generation)) = self.entry.take() {
            let mut tokens = self.registry.tokens();
            if tokens.get(&id).is_some_and(|(g, _)| *g == generation) {
                tokens.remove(&id);
            }
        }
    }
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn tokens(&self) -> std::sync::MutexGuard<'_, HashMap<String, (u64, CancellationToken)>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a fresh token under `request_id`, if there is one.
    ///
    /// A later registration under the same id replaces the earlier one.
    pub fn register(&self, request_id: Option<&str>) -> CancelGuard<'_> {
        let token = CancellationToken::new();
        let entry = request_id.map(|id| {
            let generation = self.next.fetch_add(1, Ordering::Relaxed);
            self.tokens()
                .insert(id.to_string(), (generation, token.clone()));
            (id.to_string(), generation)
        });
        CancelGuard {
            registry: self,
            entry,
            token,
        }
    }

    /// Cancel the operation registered under `request_id`.
    ///
    /// Returns false if no such operation is in flight.
    pub fn cancel(&self, request_id: &str) -> bool {
        match self.tokens().get(request_id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.tokens().len()
    }
}

impl Engine {
    /// Push the checked-out branch, setting its upstream on first push.
    pub async fn push(&self, dir: &Path, request_id: Option<&str>) -> Result<(), CoreError> {
        let handle = self.registry.open(dir).await?;
        let preferred = self.config.remote().to_string();
        let transport = Arc::clone(&self.transport);
        let guard = self.cancels.register(request_id);

        handle
            .mutate_then(
                move |git| Ok((git.work_dir().to_path_buf(), push_target(git, &preferred)?)),
                |(work_dir, target)| async move {
                    tracing::debug!(
                        remote = %target.remote,
                        branch = %target.local_branch,
                        "pushing"
                    );
                    transport
                        .push(&work_dir, &target, guard.token())
                        .await
                        .map_err(CoreError::from)
                },
            )
            .await
    }

    /// Fetch from the upstream remote, or the preferred one.
    pub async fn fetch(&self, dir: &Path, request_id: Option<&str>) -> Result<(), CoreError> {
        let handle = self.registry.open(dir).await?;
        let preferred = self.config.remote().to_string();
        let transport = Arc::clone(&self.transport);
        let guard = self.cancels.register(request_id);

        handle
            .mutate_then(
                move |git| Ok((git.work_dir().to_path_buf(), fetch_remote(git, &preferred)?)),
                |(work_dir, remote)| async move {
                    tracing::debug!(%remote, "fetching");
                    transport
                        .fetch(&work_dir, &remote, guard.token())
                        .await
                        .map_err(CoreError::from)
                },
            )
            .await
    }

    /// Rebase the checked-out branch onto its remote counterpart.
    pub async fn pull(&self, dir: &Path, request_id: Option<&str>) -> Result<(), CoreError> {
        let handle = self.registry.open(dir).await?;
        let preferred = self.config.remote().to_string();
        let transport = Arc::clone(&self.transport);
        let guard = self.cancels.register(request_id);

        handle
            .mutate_then(
                move |git| Ok((git.work_dir().to_path_buf(), pull_target(git, &preferred)?)),
                |(work_dir, target)| async move {
                    tracing::debug!(
                        remote = %target.remote,
                        branch = %target.remote_branch,
                        "pulling"
                    );
                    transport
                        .pull(&work_dir, &target, guard.token())
                        .await
                        .map_err(CoreError::from)
                },
            )
            .await
    }

    /// Cancel the network command registered under `request_id`.
    pub fn cancel(&self, request_id: &str) -> bool {
        let found = self.cancels.cancel(request_id);
        tracing::debug!(request_id, found, "cancel requested");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_reaches_registered_token() {
        let registry = CancelRegistry::new();
        let guard = registry.register(Some("7"));
        assert!(registry.cancel("7"));
        assert!(guard.token().is_cancelled());
    }

    #[test]
    fn unknown_id_is_not_cancelled() {
        let registry = CancelRegistry::new();
        assert!(!registry.cancel("nope"));
    }

    #[test]
    fn guard_unregisters_on_drop() {
        let registry = CancelRegistry::new();
        {
            let _guard = registry.register(Some("1"));
            assert_eq!(registry.in_flight(), 1);
        }
        assert_eq!(registry.in_flight(), 0);
        assert!(!registry.cancel("1"));
    }

    #[test]
    fn anonymous_operations_are_not_registered() {
        let registry = CancelRegistry::new();
        let guard = registry.register(None);
        assert_eq!(registry.in_flight(), 0);
        assert!(!guard.token().is_cancelled());
    }

    #[test]
    fn stale_guard_keeps_newer_registration() {
        let registry = CancelRegistry::new();
        let old = registry.register(Some("dup"));
        let new = registry.register(Some("dup"));
        drop(old);
        assert!(registry.cancel("dup"));
        assert!(new.token().is_cancelled());
    }
}
