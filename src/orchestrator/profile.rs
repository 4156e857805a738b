//! Profile invalidation planning. Every event is scoped by the user id.

use std::fmt;
use std::str::FromStr;

use super::{normalize_event, InvalidateOptions, InvalidationPlan, InvalidationPlanner};
use crate::cache::keys::{self, KeyKind, KeyPart};
use crate::cache::CacheDomain;
use crate::error::CacheError;
use crate::invalidation::InvalidationTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileEvent {
    Update,
    AvatarChange,
    PrivacyChange,
    Delete,
}

impl ProfileEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileEvent::Update => "update",
            ProfileEvent::AvatarChange => "avatar_change",
            ProfileEvent::PrivacyChange => "privacy_change",
            ProfileEvent::Delete => "delete",
        }
    }
}

impl fmt::Display for ProfileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileEvent {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_event(s).as_str() {
            "update" => Ok(ProfileEvent::Update),
            "avatar_change" => Ok(ProfileEvent::AvatarChange),
            "privacy_change" => Ok(ProfileEvent::PrivacyChange),
            "delete" => Ok(ProfileEvent::Delete),
            _ => Err(CacheError::InvalidRequest(format!(
                "unknown profile event '{s}'"
            ))),
        }
    }
}

/// Plans profile invalidations.
///
/// Avatars show up in admin lists and activity feeds, so an avatar change
/// reaches those too. A privacy change alters what collection responses
/// may include.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfilePlanner;

impl InvalidationPlanner for ProfilePlanner {
    type Event = ProfileEvent;

    fn name(&self) -> &'static str {
        "profile"
    }

    fn plan(&self, options: &InvalidateOptions<ProfileEvent>) -> Option<InvalidationPlan> {
        let id = options.single_id()?;
        let mut plan = InvalidationPlan::new();

        plan.primary(InvalidationTarget::key(keys::user_profile(id), CacheDomain::User));
        if options.event != ProfileEvent::Delete {
            plan.primary(InvalidationTarget::key(keys::user_detail(id), CacheDomain::User));
        }
        plan.secondary(api_for("profiles", Some(id)));

        match options.event {
            ProfileEvent::Update | ProfileEvent::Delete => {}
            ProfileEvent::AvatarChange => {
                if options.invalidate_list {
                    plan.primary(InvalidationTarget::pattern(
                        keys::prefix_pattern(KeyKind::AdminUserList, &[]),
                        CacheDomain::User,
                    ));
                }
                plan.secondary(feed_of(id));
            }
            ProfileEvent::PrivacyChange => {
                plan.secondary(feed_of(id));
                if options.invalidate_list {
                    plan.secondary(api_for("users", None));
                }
            }
        }
        plan.secondary(api_for("users", Some(id)));

        Some(plan)
    }
}

fn feed_of(id: &str) -> InvalidationTarget {
    InvalidationTarget::pattern(
        keys::prefix_pattern(KeyKind::UserActivities, &[id.into()]),
        CacheDomain::Content,
    )
}

fn api_for(resource: &str, id: Option<&str>) -> InvalidationTarget {
    let id: KeyPart<'_> = id.into();
    InvalidationTarget::pattern(
        keys::prefix_pattern(KeyKind::ApiResponse, &[resource.into(), id]),
        CacheDomain::Api,
    )
}
