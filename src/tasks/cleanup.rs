//! Periodic Sweep Task
//!
//! Background task that periodically drops stale records: expired cache
//! entries, idle health statistics and elapsed rate-limit windows.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Shortest interval a sweep may run at.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Spawns a background task that runs `sweep` every `interval`.
///
/// The task runs in an infinite loop, sleeping for the interval between
/// runs. `sweep` returns how many records it removed, which is logged.
///
/// # Arguments
/// * `name` - Label used in log lines
/// * `interval` - Time between sweeps
/// * `sweep` - Produces one sweep run
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let instance = registry.get(CacheDomain::User);
/// let handle = spawn_sweep("cache:user", Duration::from_secs(300), move || {
///     let instance = instance.clone();
///     async move { instance.cleanup_expired().await }
/// });
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep<F, Fut>(name: impl Into<String>, interval: Duration, mut sweep: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = usize> + Send + 'static,
{
    let name = name.into();
    let interval = interval.max(MIN_INTERVAL);

    tokio::spawn(async move {
        info!(
            task = %name,
            interval_ms = interval.as_millis() as u64,
            "Starting sweep task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = sweep().await;

            if removed > 0 {
                info!(task = %name, removed, "Sweep removed stale records");
            } else {
                debug!(task = %name, "Sweep found nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheInstance;
    use crate::cache::CacheDomain;
    use crate::config::CacheInstanceConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn instance() -> Arc<CacheInstance> {
        Arc::new(CacheInstance::new(
            CacheDomain::Session,
            CacheInstanceConfig {
                max_size: 100,
                default_ttl_ms: 60_000,
                cleanup_interval_ms: 20,
                enabled: true,
            },
        ))
    }

    fn sweep_of(instance: &Arc<CacheInstance>) -> JoinHandle<()> {
        let instance = Arc::clone(instance);
        spawn_sweep("cache:session", Duration::from_millis(20), move || {
            let instance = instance.clone();
            async move { instance.cleanup_expired().await }
        })
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_entries() {
        let instance = instance();
        instance
            .set("expire_soon", json!("value"), Some(Duration::from_millis(10)))
            .await;

        let handle = sweep_of(&instance);

        tokio::time::sleep(Duration::from_millis(150)).await;

        // Counted as expired by the sweep rather than by a read
        assert_eq!(instance.len().await, 0);
        assert_eq!(instance.stats().await.stats.expired_removed, 1);
        assert_eq!(instance.stats().await.stats.total_misses, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_preserves_valid_entries() {
        let instance = instance();
        instance
            .set("long_lived", json!("value"), Some(Duration::from_secs(3600)))
            .await;

        let handle = sweep_of(&instance);

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(instance.get("long_lived").await, Some(json!("value")));

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_runs_repeatedly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let handle = spawn_sweep("counter", Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { 0 }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(runs.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_sweep_can_be_aborted() {
        let handle = sweep_of(&instance());

        handle.abort();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
