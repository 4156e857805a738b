//! User invalidation planning.

use std::fmt;
use std::str::FromStr;

use super::{normalize_event, InvalidateOptions, InvalidationPlan, InvalidationPlanner};
use crate::cache::keys::{self, KeyKind, KeyPart};
use crate::cache::CacheDomain;
use crate::error::CacheError;
use crate::invalidation::InvalidationTarget;

const API_RESOURCE: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserEvent {
    Create,
    Update,
    Delete,
    BatchDelete,
    StatusChange,
}

impl UserEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserEvent::Create => "create",
            UserEvent::Update => "update",
            UserEvent::Delete => "delete",
            UserEvent::BatchDelete => "batch_delete",
            UserEvent::StatusChange => "status_change",
        }
    }
}

impl fmt::Display for UserEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserEvent {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_event(s).as_str() {
            "create" => Ok(UserEvent::Create),
            "update" => Ok(UserEvent::Update),
            "delete" => Ok(UserEvent::Delete),
            "batch_delete" => Ok(UserEvent::BatchDelete),
            "status_change" => Ok(UserEvent::StatusChange),
            _ => Err(CacheError::InvalidRequest(format!("unknown user event '{s}'"))),
        }
    }
}

/// Plans user invalidations.
///
/// | Event           | Primary                                    | Secondary                  |
/// |-----------------|--------------------------------------------|----------------------------|
/// | `create`        | admin lists                                | stats, API collections     |
/// | `update`        | detail, profile, admin lists               | stats, API for the user    |
/// | `delete`        | as update + sessions and activity feed     | as update                  |
/// | `batch_delete`  | delete targets of every id                 | as update, per id          |
/// | `status_change` | detail, sessions, admin lists              | stats, API for the user    |
#[derive(Debug, Clone, Copy, Default)]
pub struct UserPlanner;

impl InvalidationPlanner for UserPlanner {
    type Event = UserEvent;

    fn name(&self) -> &'static str {
        "user"
    }

    fn plan(&self, options: &InvalidateOptions<UserEvent>) -> Option<InvalidationPlan> {
        let mut plan = InvalidationPlan::new();

        match options.event {
            UserEvent::Create => {}
            UserEvent::Update => {
                let id = options.single_id()?;
                plan.primary(InvalidationTarget::key(keys::user_detail(id), CacheDomain::User))
                    .primary(InvalidationTarget::key(keys::user_profile(id), CacheDomain::User))
                    .secondary(api_for(id));
            }
            UserEvent::Delete => {
                let id = options.single_id()?;
                removed_user(&mut plan, id);
            }
            UserEvent::BatchDelete => {
                let ids = options.batch_ids();
                if ids.is_empty() {
                    return None;
                }
                for id in ids {
                    removed_user(&mut plan, id);
                }
            }
            UserEvent::StatusChange => {
                let id = options.single_id()?;
                plan.primary(InvalidationTarget::key(keys::user_detail(id), CacheDomain::User))
                    .primary(sessions_of(id))
                    .secondary(api_for(id));
            }
        }

        if options.invalidate_list {
            plan.primary(InvalidationTarget::pattern(
                keys::prefix_pattern(KeyKind::AdminUserList, &[]),
                CacheDomain::User,
            ))
            .secondary(InvalidationTarget::pattern(
                keys::prefix_pattern(KeyKind::ApiResponse, &[API_RESOURCE.into(), KeyPart::Absent]),
                CacheDomain::Api,
            ));
        }
        if options.invalidate_stats {
            plan.secondary(InvalidationTarget::pattern(
                keys::prefix_pattern(KeyKind::UserStats, &[]),
                CacheDomain::Stats,
            ));
        }

        Some(plan)
    }
}

fn removed_user(plan: &mut InvalidationPlan, id: &str) {
    plan.primary(InvalidationTarget::key(keys::user_detail(id), CacheDomain::User))
        .primary(InvalidationTarget::key(keys::user_profile(id), CacheDomain::User))
        .primary(sessions_of(id))
        .primary(InvalidationTarget::pattern(
            keys::prefix_pattern(KeyKind::UserActivities, &[id.into()]),
            CacheDomain::Content,
        ))
        .secondary(api_for(id));
}

fn sessions_of(id: &str) -> InvalidationTarget {
    InvalidationTarget::pattern(
        keys::prefix_pattern(KeyKind::UserSessions, &[id.into()]),
        CacheDomain::Session,
    )
}

fn api_for(id: &str) -> InvalidationTarget {
    InvalidationTarget::pattern(
        keys::prefix_pattern(KeyKind::ApiResponse, &[API_RESOURCE.into(), id.into()]),
        CacheDomain::Api,
    )
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn plan(options: InvalidateOptions<UserEvent>) -> InvalidationPlan {
        UserPlanner.plan(&options).unwrap()
    }

    #[test]
    fn test_event_parsing() {
        assert_eq!("UPDATE".parse::<UserEvent>().unwrap(), UserEvent::Update);
        assert_eq!("batch-delete".parse::<UserEvent>().unwrap(), UserEvent::BatchDelete);
        assert_eq!(UserEvent::StatusChange.to_string(), "status_change");
        assert!(matches!(
            "archive".parse::<UserEvent>(),
            Err(CacheError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_update_plan() {
        let plan = plan(InvalidateOptions::new(UserEvent::Update).with_id("42"));

        assert_eq!(
            texts(&plan),
            vec![
                "user:detail:42",
                "user:profile:42",
                "user:admin:list:*",
                "api:response:users:42:*",
                "api:response:users:~:*",
                "stats:users:*",
            ]
        );
    }

    #[test]
    fn test_flags_drop_aggregates() {
        let plan = plan(
            InvalidateOptions::new(UserEvent::Update)
                .with_id("42")
                .with_list(false)
                .with_stats(false),
        );

        assert_eq!(
            texts(&plan),
            vec!["user:detail:42", "user:profile:42", "api:response:users:42:*"]
        );
    }

    #[test]
    fn test_create_needs_no_id() {
        let plan = plan(InvalidateOptions::new(UserEvent::Create));
        assert_eq!(
            texts(&plan),
            vec!["user:admin:list:*", "api:response:users:~:*", "stats:users:*"]
        );
    }

    #[test]
    fn test_delete_reaches_sessions_and_feed() {
        let plan = plan(InvalidateOptions::new(UserEvent::Delete).with_id("9").with_list(false));
        let texts = texts(&plan);

        assert!(texts.contains(&"session:user:9:*"));
        assert!(texts.contains(&"content:activities:user:9:*"));
    }

    #[test]
    fn test_batch_delete_covers_every_id_once() {
        let plan = plan(InvalidateOptions::new(UserEvent::BatchDelete).with_ids(["1", "2", "1"]));
        let texts = texts(&plan);

        assert_eq!(texts.iter().filter(|t| **t == "user:detail:1").count(), 1);
        assert!(texts.contains(&"user:detail:2"));
        assert_eq!(texts.iter().filter(|t| **t == "user:admin:list:*").count(), 1);
    }

    #[test]
    fn test_missing_scope() {
        for event in [UserEvent::Update, UserEvent::Delete, UserEvent::StatusChange] {
            assert!(UserPlanner.plan(&InvalidateOptions::new(event)).is_none());
        }
        assert!(UserPlanner
            .plan(&InvalidateOptions::new(UserEvent::BatchDelete).with_ids(Vec::<String>::new()))
            .is_none());
    }

    #[tokio::test]
    async fn test_update_leaves_other_users_cached() {
        let users = orchestrator(UserPlanner);
        seed(
            &users,
            &[
                "user:detail:1",
                "user:detail:2",
                "user:admin:list:1:20:~",
                "api:response:users:1:q",
                "api:response:users:2:q",
            ],
        )
        .await;

        let results = users
            .invalidate(InvalidateOptions::new(UserEvent::Update).with_id("1"))
            .await;

        assert!(results.iter().all(|r| r.success));
        assert!(!present(&users, "user:detail:1").await);
        assert!(!present(&users, "user:admin:list:1:20:~").await);
        assert!(!present(&users, "api:response:users:1:q").await);
        assert!(present(&users, "user:detail:2").await);
        assert!(present(&users, "api:response:users:2:q").await);
    }

    #[tokio::test]
    async fn test_batch_delete_runs_every_id() {
        let users = orchestrator(UserPlanner);
        seed(
            &users,
            &["user:detail:1", "user:detail:2", "session:user:1:a", "session:user:2:b"],
        )
        .await;

        users
            .invalidate(InvalidateOptions::new(UserEvent::BatchDelete).with_ids(["1", "2"]))
            .await;

        for key in ["user:detail:1", "user:detail:2", "session:user:1:a", "session:user:2:b"] {
            assert!(!present(&users, key).await, "{key} should be gone");
        }
    }

    #[tokio::test]
    async fn test_stats_flag_controls_user_aggregates() {
        let users = orchestrator(UserPlanner);
        let total = keys::user_stats("total");
        seed(&users, &[total.as_str()]).await;

        users
            .invalidate(InvalidateOptions::new(UserEvent::Create).with_stats(false))
            .await;
        assert!(present(&users, &total).await);

        users.invalidate(InvalidateOptions::new(UserEvent::Create)).await;
        assert!(!present(&users, &total).await);
    }
}
