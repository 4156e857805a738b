//! Wildcard key patterns.
//!
//! A pattern is a literal with an optional `*` at either end:
//!
//! | Pattern      | Matches keys that        |
//! |--------------|--------------------------|
//! | `user:1`     | equal `user:1`           |
//! | `user:*`     | start with `user:`       |
//! | `*:1`        | end with `:1`            |
//! | `*admin*`    | contain `admin`          |
//! | `*`          | anything                 |
//!
//! A `*` anywhere else is rejected rather than interpreted as a glob.

use std::fmt;
use std::str::FromStr;

use crate::error::CacheError;

const WILDCARD: char = '*';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Any,
}

impl KeyPattern {
    /// Parses a pattern, rejecting empty input and inner wildcards.
    pub fn parse(raw: &str) -> Result<Self, CacheError> {
        if raw.is_empty() {
            return Err(CacheError::InvalidPattern("pattern is empty".to_string()));
        }

        let leading = raw.starts_with(WILDCARD);
        let trailing = raw.len() > 1 && raw.ends_with(WILDCARD);
        let start = usize::from(leading);
        let end = raw.len() - usize::from(trailing);
        let literal = if start <= end { &raw[start..end] } else { "" };

        if literal.contains(WILDCARD) {
            return Err(CacheError::InvalidPattern(format!(
                "'{raw}' has a wildcard outside its ends"
            )));
        }

        let literal = literal.to_string();
        Ok(match (leading, trailing) {
            _ if literal.is_empty() => KeyPattern::Any,
            (false, false) => KeyPattern::Exact(literal),
            (false, true) => KeyPattern::Prefix(literal),
            (true, false) => KeyPattern::Suffix(literal),
            (true, true) => KeyPattern::Contains(literal),
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Exact(literal) => key == literal,
            KeyPattern::Prefix(literal) => key.starts_with(literal.as_str()),
            KeyPattern::Suffix(literal) => key.ends_with(literal.as_str()),
            KeyPattern::Contains(literal) => key.contains(literal.as_str()),
            KeyPattern::Any => true,
        }
    }

    /// The pattern without its wildcards.
    pub fn literal(&self) -> &str {
        match self {
            KeyPattern::Exact(literal)
            | KeyPattern::Prefix(literal)
            | KeyPattern::Suffix(literal)
            | KeyPattern::Contains(literal) => literal,
            KeyPattern::Any => "",
        }
    }

    /// True when the pattern can match at most one key.
    pub fn is_exact(&self) -> bool {
        matches!(self, KeyPattern::Exact(_))
    }

    /// Whether some key could match both patterns.
    ///
    /// Exact and prefix patterns are compared precisely; patterns that are
    /// not anchored at the start are assumed to overlap with anything except
    /// an exact key they do not match.
    pub fn overlaps(&self, other: &KeyPattern) -> bool {
        use KeyPattern::*;

        match (self, other) {
            (Exact(key), pattern) | (pattern, Exact(key)) => pattern.matches(key),
            (Prefix(a), Prefix(b)) => a.starts_with(b.as_str()) || b.starts_with(a.as_str()),
            _ => true,
        }
    }
}

impl FromStr for KeyPattern {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPattern::parse(s)
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPattern::Exact(literal) => write!(f, "{literal}"),
            KeyPattern::Prefix(literal) => write!(f, "{literal}*"),
            KeyPattern::Suffix(literal) => write!(f, "*{literal}"),
            KeyPattern::Contains(literal) => write!(f, "*{literal}*"),
            KeyPattern::Any => write!(f, "*"),
        }
    }
}
