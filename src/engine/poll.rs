//! engine::poll
//!
//! Coalescing of concurrent identical reads.
//!
//! # Architecture
//!
//! Callers poll working-tree status on a timer and may ask again before the
//! previous answer arrived. [`Coalescer`] keeps at most one computation in
//! flight: the first caller runs it, everyone who arrives meanwhile
//! subscribes to a broadcast channel and receives a clone of the same
//! result.
//!
//! # Invariants
//!
//! - At most one computation runs at a time per coalescer
//! - If the running caller is dropped mid-flight, waiters are released and
//!   the next of them runs the computation itself

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::broadcast;

/// Shares one in-flight computation among concurrent callers.
#[derive(Debug)]
pub struct Coalescer<T> {
    inflight: Mutex<Option<broadcast::Sender<T>>>,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self {
            inflight: Mutex::new(None),
        }
    }
}

/// Clears the in-flight slot when the running caller finishes or is dropped.
struct Leader<'a, T> {
    slot: &'a Mutex<Option<broadcast::Sender<T>>>,
}

impl<T> Leader<'_, T> {
    fn take(&self) -> Option<broadcast::Sender<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

impl<T> Drop for Leader<'_, T> {
    fn drop(&mut self) {
        // dropping the sender wakes any waiters with `Closed`
        self.take();
    }
}

enum Role<T> {
    Lead,
    Follow(broadcast::Receiver<T>),
}

impl<T: Clone> Coalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a computation is running.
    pub fn is_busy(&self) -> bool {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Run `compute`, or join the computation already in flight.
    pub async fn run<F, Fut>(&self, compute: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        loop {
            match self.role() {
                Role::Lead => {
                    let leader = Leader {
                        slot: &self.inflight,
                    };
                    let value = compute().await;
                    if let Some(tx) = leader.take() {
                        // no receivers is fine
                        let _ = tx.send(value.clone());
                    }
                    return value;
                }
                Role::Follow(mut rx) => {
                    tracing::trace!("joining in-flight read");
                    match rx.recv().await {
                        Ok(value) => return value,
                        Err(_) => continue,
                    }
                }
            }
        }
    }

    fn role(&self) -> Role<T> {
        let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(tx) => Role::Follow(tx.subscribe()),
            None => {
                let (tx, _) = broadcast::channel(1);
                *slot = Some(tx);
                Role::Lead
            }
        }
    }
}
