//! Cache key generation.
//!
//! Keys read `domain:subtype:param1:param2...`. The first segment is always a
//! [`CacheDomain`] name so a key can be routed to its instance. Parameters are
//! escaped so that distinct parameter tuples never produce the same key, and
//! no generated key contains the `*` wildcard.

use std::borrow::Cow;

use super::CacheDomain;

const SEPARATOR: char = ':';
/// Rendering of an absent optional parameter.
const ABSENT: &str = "~";

/// Entity kinds that own cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    UserDetail,
    UserProfile,
    AdminUserList,
    UserStats,
    UserSessions,
    PublicSettings,
    AdminSettings,
    SettingsCategory,
    ActivityDetail,
    ActivityList,
    UserActivities,
    CategoryActivities,
    ActivityStats,
    ApiResponse,
}

impl KeyKind {
    /// Instance that stores keys of this kind.
    pub fn domain(&self) -> CacheDomain {
        match self {
            KeyKind::UserDetail | KeyKind::UserProfile | KeyKind::AdminUserList => {
                CacheDomain::User
            }
            KeyKind::UserStats | KeyKind::ActivityStats => CacheDomain::Stats,
            KeyKind::UserSessions => CacheDomain::Session,
            KeyKind::PublicSettings | KeyKind::AdminSettings | KeyKind::SettingsCategory => {
                CacheDomain::Config
            }
            KeyKind::ActivityDetail
            | KeyKind::ActivityList
            | KeyKind::UserActivities
            | KeyKind::CategoryActivities => CacheDomain::Content,
            KeyKind::ApiResponse => CacheDomain::Api,
        }
    }

    fn subtype(&self) -> &'static str {
        match self {
            KeyKind::UserDetail => "detail",
            KeyKind::UserProfile => "profile",
            KeyKind::AdminUserList => "admin:list",
            KeyKind::UserStats => "users",
            KeyKind::UserSessions => "user",
            KeyKind::PublicSettings => "public",
            KeyKind::AdminSettings => "admin",
            KeyKind::SettingsCategory => "category",
            KeyKind::ActivityDetail => "activity",
            KeyKind::ActivityList => "activities:list",
            KeyKind::UserActivities => "activities:user",
            KeyKind::CategoryActivities => "activities:category",
            KeyKind::ActivityStats => "activities",
            KeyKind::ApiResponse => "response",
        }
    }
}

/// One scoping parameter of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPart<'a> {
    Value(Cow<'a, str>),
    Absent,
}

impl<'a> From<&'a str> for KeyPart<'a> {
    fn from(value: &'a str) -> Self {
        KeyPart::Value(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a String> for KeyPart<'a> {
    fn from(value: &'a String) -> Self {
        KeyPart::Value(Cow::Borrowed(value.as_str()))
    }
}

impl From<String> for KeyPart<'_> {
    fn from(value: String) -> Self {
        KeyPart::Value(Cow::Owned(value))
    }
}

impl From<u32> for KeyPart<'_> {
    fn from(value: u32) -> Self {
        KeyPart::Value(Cow::Owned(value.to_string()))
    }
}

impl From<u64> for KeyPart<'_> {
    fn from(value: u64) -> Self {
        KeyPart::Value(Cow::Owned(value.to_string()))
    }
}

impl<'a, T: Into<KeyPart<'a>>> From<Option<T>> for KeyPart<'a> {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(KeyPart::Absent)
    }
}

/// Builds the key of `kind` scoped by `params`.
pub fn generate(kind: KeyKind, params: &[KeyPart<'_>]) -> String {
    let mut key = format!("{}{SEPARATOR}{}", kind.domain(), kind.subtype());
    for param in params {
        key.push(SEPARATOR);
        match param {
            KeyPart::Value(value) => escape_into(&mut key, value),
            KeyPart::Absent => key.push_str(ABSENT),
        }
    }
    key
}

/// Pattern matching every key of `kind` whose leading params equal `params`.
pub fn prefix_pattern(kind: KeyKind, params: &[KeyPart<'_>]) -> String {
    format!("{}{SEPARATOR}*", generate(kind, params))
}

fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            '*' => out.push_str("%2A"),
            '~' => out.push_str("%7E"),
            other => out.push(other),
        }
    }
}

// Convenience builders used by the orchestrators and read paths.

pub fn user_detail(user_id: &str) -> String {
    generate(KeyKind::UserDetail, &[user_id.into()])
}

pub fn user_profile(user_id: &str) -> String {
    generate(KeyKind::UserProfile, &[user_id.into()])
}

pub fn admin_user_list(page: u32, limit: u32, filter: Option<&str>) -> String {
    generate(
        KeyKind::AdminUserList,
        &[page.into(), limit.into(), filter.into()],
    )
}

pub fn user_stats(scope: &str) -> String {
    generate(KeyKind::UserStats, &[scope.into()])
}

pub fn public_settings(language: Option<&str>) -> String {
    generate(KeyKind::PublicSettings, &[language.into()])
}

pub fn admin_settings(category: Option<&str>) -> String {
    generate(KeyKind::AdminSettings, &[category.into()])
}

pub fn settings_category(category: &str) -> String {
    generate(KeyKind::SettingsCategory, &[category.into()])
}

pub fn activity_detail(activity_id: &str) -> String {
    generate(KeyKind::ActivityDetail, &[activity_id.into()])
}

pub fn activity_list(page: u32, category: Option<&str>) -> String {
    generate(KeyKind::ActivityList, &[page.into(), category.into()])
}

pub fn user_activities(user_id: &str, page: u32) -> String {
    generate(KeyKind::UserActivities, &[user_id.into(), page.into()])
}

pub fn activity_stats(scope: &str) -> String {
    generate(KeyKind::ActivityStats, &[scope.into()])
}

/// Cached API response for `resource`, optionally scoped to one entity.
pub fn api_response(resource: &str, entity_id: Option<&str>, query: &str) -> String {
    generate(
        KeyKind::ApiResponse,
        &[resource.into(), entity_id.into(), query.into()],
    )
}
