//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache sweep: removes expired entries, one task per cache instance
//! - Health sweep: drops idle invalidation statistics and logs the overview
//! - Rate limit sweep: drops elapsed window records, one task per limiter

mod cleanup;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::context::AppContext;
use crate::rate_limit::RateLimiter;

pub use cleanup::spawn_sweep;

/// Handles of every running sweep; [`stop`](Self::stop) aborts them.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Vec<(String, JoinHandle<()>)>,
}

impl BackgroundTasks {
    /// Spawns every sweep of `ctx`. Must be called from within a Tokio runtime.
    pub fn start(ctx: &AppContext, config: &Config) -> Self {
        let mut tasks = Self::default();

        for instance in ctx.caches.all() {
            let name = format!("cache:{}", instance.domain());
            let interval = Duration::from_millis(instance.config().cleanup_interval_ms);
            let instance = Arc::clone(instance);
            tasks.push(
                name.clone(),
                spawn_sweep(name, interval, move || {
                    let instance = instance.clone();
                    async move { instance.cleanup_expired().await }
                }),
            );
        }

        let monitor = Arc::clone(&ctx.monitor);
        tasks.push(
            "health".to_string(),
            spawn_sweep(
                "health",
                Duration::from_millis(config.health.cleanup_interval_ms),
                move || {
                    let monitor = monitor.clone();
                    async move { monitor.sweep() }
                },
            ),
        );

        let limiter_interval = Duration::from_millis(config.rate_limit_cleanup_interval_ms);
        for limiter in [&ctx.admin_limiter, &ctx.sensitive_limiter] {
            let name = format!("rate_limit:{}", limiter.config().key_prefix);
            tasks.push(name.clone(), limiter_sweep(name, limiter_interval, limiter));
        }

        info!(tasks = tasks.len(), "Background sweeps started");
        tasks
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Aborts every sweep.
    pub fn stop(&mut self) {
        for (name, handle) in self.handles.drain(..) {
            handle.abort();
            info!(task = %name, "Sweep task stopped");
        }
    }

    fn push(&mut self, name: String, handle: JoinHandle<()>) {
        self.handles.push((name, handle));
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for (_, handle) in &self.handles {
            handle.abort();
        }
    }
}

fn limiter_sweep(name: String, interval: Duration, limiter: &Arc<RateLimiter>) -> JoinHandle<()> {
    let limiter = Arc::clone(limiter);
    spawn_sweep(name, interval, move || {
        let removed = limiter.cleanup_expired();
        async move { removed }
    })
}
