//! Declarative invalidation rules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::KeyPattern;
use crate::cache::CacheDomain;

/// Routes patterns to the instances that may hold matching keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationRule {
    pub pattern: String,
    pub target_instances: BTreeSet<CacheDomain>,
    pub enabled: bool,
}

impl InvalidationRule {
    pub fn new(pattern: impl Into<String>, targets: impl IntoIterator<Item = CacheDomain>) -> Self {
        Self {
            pattern: pattern.into(),
            target_instances: targets.into_iter().collect(),
            enabled: true,
        }
    }

    /// Whether this rule routes `requested`. Disabled rules and rules whose
    /// own pattern is malformed never apply.
    pub fn applies_to(&self, requested: &KeyPattern) -> bool {
        self.enabled
            && KeyPattern::parse(&self.pattern)
                .map(|own| own.overlaps(requested))
                .unwrap_or(false)
    }
}

/// One rule per domain, routing `<domain>:*` to that domain's instance.
pub fn default_rules() -> Vec<InvalidationRule> {
    CacheDomain::ALL
        .into_iter()
        .map(|domain| InvalidationRule::new(format!("{domain}:*"), [domain]))
        .collect()
}

/// Union of the targets of every rule applying to `requested`.
pub fn resolve_targets(rules: &[InvalidationRule], requested: &KeyPattern) -> Vec<CacheDomain> {
    rules
        .iter()
        .filter(|rule| rule.applies_to(requested))
        .flat_map(|rule| rule.target_instances.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
