//! Activity invalidation planning.

use std::fmt;
use std::str::FromStr;

use super::{normalize_event, InvalidateOptions, InvalidationPlan, InvalidationPlanner};
use crate::cache::keys::{self, KeyKind, KeyPart};
use crate::cache::CacheDomain;
use crate::error::CacheError;
use crate::invalidation::InvalidationTarget;

const API_RESOURCE: &str = "activities";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityEvent {
    Create,
    Update,
    Delete,
    BatchDelete,
    StatusChange,
}

impl ActivityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityEvent::Create => "create",
            ActivityEvent::Update => "update",
            ActivityEvent::Delete => "delete",
            ActivityEvent::BatchDelete => "batch_delete",
            ActivityEvent::StatusChange => "status_change",
        }
    }
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityEvent {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_event(s).as_str() {
            "create" => Ok(ActivityEvent::Create),
            "update" => Ok(ActivityEvent::Update),
            "delete" => Ok(ActivityEvent::Delete),
            "batch_delete" => Ok(ActivityEvent::BatchDelete),
            "status_change" => Ok(ActivityEvent::StatusChange),
            _ => Err(CacheError::InvalidRequest(format!(
                "unknown activity event '{s}'"
            ))),
        }
    }
}

/// Plans activity invalidations.
///
/// List views are scoped by the `categories` option when given; without
/// categories every category listing is dropped. Per-user feeds are always
/// dropped as a whole since the owning user is not part of the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityPlanner;

impl InvalidationPlanner for ActivityPlanner {
    type Event = ActivityEvent;

    fn name(&self) -> &'static str {
        "activity"
    }

    fn plan(&self, options: &InvalidateOptions<ActivityEvent>) -> Option<InvalidationPlan> {
        let mut plan = InvalidationPlan::new();

        let ids = match options.event {
            ActivityEvent::Create => Vec::new(),
            ActivityEvent::Update | ActivityEvent::Delete | ActivityEvent::StatusChange => {
                vec![options.single_id()?]
            }
            ActivityEvent::BatchDelete => options.batch_ids(),
        };
        if options.event == ActivityEvent::BatchDelete && ids.is_empty() {
            return None;
        }

        for id in &ids {
            plan.primary(InvalidationTarget::key(
                keys::activity_detail(id),
                CacheDomain::Content,
            ))
            .secondary(InvalidationTarget::pattern(
                keys::prefix_pattern(KeyKind::ApiResponse, &[API_RESOURCE.into(), (*id).into()]),
                CacheDomain::Api,
            ));
        }

        if options.invalidate_list {
            list_targets(&mut plan, &options.categories);
        }
        if options.invalidate_stats {
            plan.secondary(InvalidationTarget::pattern(
                keys::prefix_pattern(KeyKind::ActivityStats, &[]),
                CacheDomain::Stats,
            ));
        }

        Some(plan)
    }
}

fn list_targets(plan: &mut InvalidationPlan, categories: &[String]) {
    plan.primary(content(KeyKind::ActivityList, &[]));
    if categories.is_empty() {
        plan.primary(content(KeyKind::CategoryActivities, &[]));
    } else {
        for category in categories {
            plan.primary(content(KeyKind::CategoryActivities, &[category.into()]));
        }
    }
    plan.primary(content(KeyKind::UserActivities, &[]))
        .secondary(InvalidationTarget::pattern(
            keys::prefix_pattern(KeyKind::ApiResponse, &[API_RESOURCE.into(), KeyPart::Absent]),
            CacheDomain::Api,
        ));
}

fn content(kind: KeyKind, params: &[KeyPart<'_>]) -> InvalidationTarget {
    InvalidationTarget::pattern(keys::prefix_pattern(kind, params), CacheDomain::Content)
}
