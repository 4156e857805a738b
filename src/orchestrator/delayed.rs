//! Pending delayed invalidations.
//!
//! Each pending pass is keyed by a scope (`orchestrator:ids`). Scheduling a
//! pass for a scope that already has one pending aborts the older pass and
//! carries its targets over, so the newer pass covers both.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::invalidation::InvalidationTarget;

#[derive(Debug)]
struct Pending {
    generation: u64,
    handle: AbortHandle,
    targets: Vec<InvalidationTarget>,
}

/// Tracks delayed invalidation tasks so they can be cancelled.
#[derive(Debug, Default)]
pub struct DelayedInvalidations {
    pending: Arc<DashMap<String, Pending>>,
    next_generation: AtomicU64,
}

impl DelayedInvalidations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `run(targets)` after `delay`, replacing any pass pending for
    /// `scope`. Targets of the replaced pass that `targets` lacks are
    /// appended, keeping their order.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F, Fut>(
        &self,
        scope: impl Into<String>,
        delay: Duration,
        mut targets: Vec<InvalidationTarget>,
        run: F,
    ) where
        F: FnOnce(Vec<InvalidationTarget>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let scope = scope.into();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let task_scope = scope.clone();

        // The shard stays locked until the handle is stored, so a task that
        // finishes instantly still finds its own entry to remove.
        let entry = self.pending.entry(scope);
        if let Entry::Occupied(occupied) = &entry {
            for target in &occupied.get().targets {
                if !targets.contains(target) {
                    targets.push(target.clone());
                }
            }
        }

        let task_targets = targets.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            run(task_targets).await;
            pending.remove_if(&task_scope, |_, p| p.generation == generation);
        });

        let next = Pending {
            generation,
            handle: handle.abort_handle(),
            targets,
        };
        match entry {
            Entry::Occupied(mut occupied) => {
                let superseded = occupied.insert(next);
                superseded.handle.abort();
                debug!(
                    scope = %occupied.key(),
                    carried = superseded.targets.len(),
                    "Pending delayed invalidation superseded"
                );
            }
            Entry::Vacant(vacant) => {
                vacant.insert(next);
            }
        }
    }

    /// Aborts every pending pass; returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        self.pending.retain(|_, pending| {
            pending.handle.abort();
            cancelled += 1;
            false
        });
        if cancelled > 0 {
            info!(cancelled, "Pending delayed invalidations cancelled");
        }
        cancelled
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
