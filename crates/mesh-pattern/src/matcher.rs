//! # Matchers
//!
//! The compiled form a subscription holds: either the global wildcard, an
//! anchored regex, or a caller-supplied predicate.

use crate::compile::{compile_regex, PatternError};
use mesh_types::Separator;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// A caller-supplied predicate matcher over event-type strings.
pub type PredicateFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A compiled subscription matcher.
#[derive(Clone)]
pub enum Matcher {
    /// `*` as the whole pattern: matches every event type.
    All,
    /// A compiled pattern expression.
    Compiled { pattern: String, regex: Regex },
    /// A function matcher; bypasses compilation entirely.
    Predicate(PredicateFn),
}

impl Matcher {
    /// Compile a pattern expression for the given separator.
    ///
    /// # Errors
    ///
    /// `PatternError` for empty patterns, empty alternatives, unterminated
    /// or unbalanced braces, and unsupported constructs. A failed compile
    /// means the subscription is not installed.
    pub fn compile(pattern: &str, separator: Separator) -> Result<Self, PatternError> {
        if pattern == "*" {
            return Ok(Self::All);
        }
        let regex = compile_regex(pattern, separator)?;
        Ok(Self::Compiled {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Wrap a predicate function as a matcher.
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Test an event-type string against this matcher.
    #[must_use]
    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            Self::All => true,
            Self::Compiled { regex, .. } => regex.is_match(event_type),
            Self::Predicate(f) => f(event_type),
        }
    }

    /// The source pattern, when this matcher was compiled from one.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::All => Some("*"),
            Self::Compiled { pattern, .. } => Some(pattern),
            Self::Predicate(_) => None,
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("Matcher::All"),
            Self::Compiled { pattern, .. } => write!(f, "Matcher::Compiled({pattern:?})"),
            Self::Predicate(_) => f.write_str("Matcher::Predicate(..)"),
        }
    }
}
