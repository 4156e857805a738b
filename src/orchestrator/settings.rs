//! Settings invalidation planning.
//!
//! Settings are scoped by category; the `id` option carries a language code
//! for [`SettingsEvent::LanguageChange`].

use std::fmt;
use std::str::FromStr;

use super::{normalize_event, InvalidateOptions, InvalidationPlan, InvalidationPlanner};
use crate::cache::keys::{self, KeyKind};
use crate::cache::CacheDomain;
use crate::error::CacheError;
use crate::invalidation::InvalidationTarget;

const API_RESOURCE: &str = "settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsEvent {
    Update,
    BatchUpdate,
    Reset,
    LanguageChange,
}

impl SettingsEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsEvent::Update => "update",
            SettingsEvent::BatchUpdate => "batch_update",
            SettingsEvent::Reset => "reset",
            SettingsEvent::LanguageChange => "language_change",
        }
    }
}

impl fmt::Display for SettingsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingsEvent {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_event(s).as_str() {
            "update" => Ok(SettingsEvent::Update),
            "batch_update" => Ok(SettingsEvent::BatchUpdate),
            "reset" => Ok(SettingsEvent::Reset),
            "language_change" => Ok(SettingsEvent::LanguageChange),
            _ => Err(CacheError::InvalidRequest(format!(
                "unknown settings event '{s}'"
            ))),
        }
    }
}

/// Plans settings invalidations.
///
/// An update scoped to categories only drops those categories; batch
/// updates and resets drop the whole config instance. A language change
/// drops public settings and every cached API response, since responses
/// are rendered per language.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsPlanner;

impl InvalidationPlanner for SettingsPlanner {
    type Event = SettingsEvent;

    fn name(&self) -> &'static str {
        "settings"
    }

    fn plan(&self, options: &InvalidateOptions<SettingsEvent>) -> Option<InvalidationPlan> {
        let mut plan = InvalidationPlan::new();
        let public = InvalidationTarget::pattern(
            keys::prefix_pattern(KeyKind::PublicSettings, &[]),
            CacheDomain::Config,
        );
        let api = InvalidationTarget::pattern(
            keys::prefix_pattern(KeyKind::ApiResponse, &[API_RESOURCE.into()]),
            CacheDomain::Api,
        );

        match options.event {
            SettingsEvent::Update if !options.categories.is_empty() => {
                for category in &options.categories {
                    plan.primary(InvalidationTarget::key(
                        keys::settings_category(category),
                        CacheDomain::Config,
                    ))
                    .primary(InvalidationTarget::key(
                        keys::admin_settings(Some(category.as_str())),
                        CacheDomain::Config,
                    ));
                }
                plan.primary(InvalidationTarget::key(
                    keys::admin_settings(None),
                    CacheDomain::Config,
                ))
                .primary(public)
                .secondary(api);
            }
            SettingsEvent::Update => {
                plan.primary(InvalidationTarget::pattern(
                    keys::prefix_pattern(KeyKind::SettingsCategory, &[]),
                    CacheDomain::Config,
                ))
                .primary(InvalidationTarget::pattern(
                    keys::prefix_pattern(KeyKind::AdminSettings, &[]),
                    CacheDomain::Config,
                ))
                .primary(public)
                .secondary(api);
            }
            SettingsEvent::BatchUpdate | SettingsEvent::Reset => {
                plan.primary(InvalidationTarget::pattern(
                    format!("{}:*", CacheDomain::Config),
                    CacheDomain::Config,
                ))
                .secondary(api);
            }
            SettingsEvent::LanguageChange => {
                match options.single_id() {
                    Some(language) => plan
                        .primary(InvalidationTarget::key(
                            keys::public_settings(Some(language)),
                            CacheDomain::Config,
                        ))
                        .primary(InvalidationTarget::key(
                            keys::public_settings(None),
                            CacheDomain::Config,
                        )),
                    None => plan.primary(public),
                };
                plan.secondary(InvalidationTarget::pattern(
                    keys::prefix_pattern(KeyKind::ApiResponse, &[]),
                    CacheDomain::Api,
                ));
            }
        }

        Some(plan)
    }
}
