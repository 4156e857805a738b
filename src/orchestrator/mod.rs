//! Domain Invalidation Orchestrators
//!
//! Each orchestrator turns a business event ("user updated", "settings
//! reset") into an [`InvalidationPlan`] and runs it through the
//! [`InvalidationService`]. Planning is pure and lives in one
//! [`InvalidationPlanner`] per domain; execution is shared by
//! [`Orchestrator`].
//!
//! A plan has two tiers. Primary targets are the entries a reader would see
//! as stale right away. Secondary targets are aggregates and cached API
//! responses; with a delay they are invalidated later in the background.

mod activity;
mod delayed;
mod profile;
mod settings;
mod user;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::invalidation::{summarize, InvalidationResult, InvalidationService, InvalidationTarget};

pub use activity::{ActivityEvent, ActivityPlanner};
pub use delayed::DelayedInvalidations;
pub use profile::{ProfileEvent, ProfilePlanner};
pub use settings::{SettingsEvent, SettingsPlanner};
pub use user::{UserEvent, UserPlanner};

pub type UserInvalidator = Orchestrator<UserPlanner>;
pub type SettingsInvalidator = Orchestrator<SettingsPlanner>;
pub type ProfileInvalidator = Orchestrator<ProfilePlanner>;
pub type ActivityInvalidator = Orchestrator<ActivityPlanner>;

// == Options ==
/// What happened, and to which entities.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidateOptions<E> {
    pub event: E,
    pub id: Option<String>,
    pub ids: Vec<String>,
    pub categories: Vec<String>,
    pub invalidate_stats: bool,
    pub invalidate_list: bool,
    pub delay: Option<Duration>,
    pub reason: Option<String>,
}

impl<E> InvalidateOptions<E> {
    pub fn new(event: E) -> Self {
        Self {
            event,
            id: None,
            ids: Vec::new(),
            categories: Vec::new(),
            invalidate_stats: true,
            invalidate_list: true,
            delay: None,
            reason: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stats(mut self, invalidate_stats: bool) -> Self {
        self.invalidate_stats = invalidate_stats;
        self
    }

    pub fn with_list(mut self, invalidate_list: bool) -> Self {
        self.invalidate_list = invalidate_list;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The single id, ignoring empty strings.
    pub fn single_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Non-empty batch ids, falling back to the single id.
    pub fn batch_ids(&self) -> Vec<&str> {
        let ids: Vec<&str> = self
            .ids
            .iter()
            .map(String::as_str)
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            self.single_id().into_iter().collect()
        } else {
            ids
        }
    }

    /// Label naming the entities this event touches, used to key delayed passes.
    fn scope_label(&self) -> String {
        let ids = self.batch_ids();
        if !ids.is_empty() {
            ids.join(",")
        } else if !self.categories.is_empty() {
            self.categories.join(",")
        } else {
            "*".to_string()
        }
    }
}

// == Plan ==
/// Targets produced for one event, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub primary: Vec<InvalidationTarget>,
    pub secondary: Vec<InvalidationTarget>,
}

impl InvalidationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a primary target unless already planned.
    pub fn primary(&mut self, target: InvalidationTarget) -> &mut Self {
        if !self.contains(&target) {
            self.primary.push(target);
        }
        self
    }

    /// Adds a secondary target unless already planned.
    pub fn secondary(&mut self, target: InvalidationTarget) -> &mut Self {
        if !self.contains(&target) {
            self.secondary.push(target);
        }
        self
    }

    pub fn contains(&self, target: &InvalidationTarget) -> bool {
        self.primary.contains(target) || self.secondary.contains(target)
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Planner ==
/// Maps the events of one domain to invalidation targets.
pub trait InvalidationPlanner: Send + Sync + 'static {
    type Event: fmt::Display + Send + Sync;

    /// Name used in logs and default reasons.
    fn name(&self) -> &'static str;

    /// Plans the targets for `options`, or `None` when the event lacks the
    /// ids it needs.
    fn plan(&self, options: &InvalidateOptions<Self::Event>) -> Option<InvalidationPlan>;
}

// == Orchestrator ==
/// Runs the plans of one planner.
#[derive(Debug)]
pub struct Orchestrator<P> {
    planner: P,
    service: Arc<InvalidationService>,
    delayed: Arc<DelayedInvalidations>,
}

impl<P: InvalidationPlanner> Orchestrator<P> {
    pub fn new(
        planner: P,
        service: Arc<InvalidationService>,
        delayed: Arc<DelayedInvalidations>,
    ) -> Self {
        Self {
            planner,
            service,
            delayed,
        }
    }

    pub fn name(&self) -> &'static str {
        self.planner.name()
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    /// Invalidates every target planned for `options`.
    ///
    /// Without a delay the returned results cover the whole plan. With a
    /// delay only primary results are returned; the secondary pass runs in
    /// the background and its outcome is logged.
    pub async fn invalidate(&self, options: InvalidateOptions<P::Event>) -> Vec<InvalidationResult> {
        let name = self.planner.name();
        let Some(plan) = self.planner.plan(&options) else {
            warn!(
                orchestrator = name,
                event = %options.event,
                "Invalidation skipped: event is missing its scope"
            );
            return Vec::new();
        };

        let reason = options
            .reason
            .clone()
            .unwrap_or_else(|| format!("{name}.{}", options.event));

        let results = match options.delay {
            Some(delay) if !plan.secondary.is_empty() => {
                let results = self
                    .service
                    .invalidate_targets(&plan.primary, Some(&reason))
                    .await;
                self.schedule_secondary(
                    format!("{name}:{}", options.scope_label()),
                    delay,
                    plan.secondary,
                    reason.clone(),
                );
                results
            }
            _ => {
                let targets: Vec<InvalidationTarget> =
                    plan.primary.into_iter().chain(plan.secondary).collect();
                self.service.invalidate_targets(&targets, Some(&reason)).await
            }
        };

        let (succeeded, failed) = summarize(&results);
        info!(
            orchestrator = name,
            event = %options.event,
            reason = %reason,
            succeeded,
            failed,
            "Invalidation finished"
        );
        results
    }

    fn schedule_secondary(
        &self,
        scope: String,
        delay: Duration,
        targets: Vec<InvalidationTarget>,
        reason: String,
    ) {
        let service = Arc::clone(&self.service);
        let task_scope = scope.clone();
        debug!(scope = %scope, delay_ms = delay.as_millis() as u64, "Delayed invalidation scheduled");

        self.delayed.schedule(scope, delay, targets, move |targets| async move {
            let results = service.invalidate_targets(&targets, Some(&reason)).await;
            let (succeeded, failed) = summarize(&results);
            if failed > 0 {
                warn!(scope = %task_scope, succeeded, failed, "Delayed invalidation had failures");
            } else {
                debug!(scope = %task_scope, succeeded, "Delayed invalidation finished");
            }
        });
    }
}

/// Normalizes an event name: `BATCH_DELETE`, `batch-delete` and
/// `batch_delete` all read `batch_delete`.
pub(crate) fn normalize_event(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('-', "_")
}
