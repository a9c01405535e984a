//! # Accept Policy
//!
//! Per-node gate over which senders may deliver events. Either a list of
//! sender patterns, a custom predicate over the event origin, or both; the
//! predicate takes precedence. A node without a policy accepts everything.
//! Rejected events are silently discarded and never reach handlers.

use mesh_pattern::{compile_cached, Matcher, PatternError};
use mesh_types::{NodeId, Origin, Separator};
use std::sync::Arc;

type OriginPredicate = Arc<dyn Fn(Option<&Origin>) -> bool + Send + Sync>;

/// The per-node accept policy.
#[derive(Clone, Default)]
pub struct AcceptPolicy {
    accept_from: Vec<Matcher>,
    accept: Option<OriginPredicate>,
}

impl AcceptPolicy {
    /// Accept everything (the default for nodes without a policy).
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Accept only senders matching one of the given patterns.
    ///
    /// # Errors
    ///
    /// `PatternError` when a pattern does not compile; the policy is not
    /// installed.
    pub fn from_patterns(patterns: &[&str], separator: Separator) -> Result<Self, PatternError> {
        let accept_from = patterns
            .iter()
            .map(|p| compile_cached(p, separator))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            accept_from,
            accept: None,
        })
    }

    /// Accept by custom predicate over the event origin. Takes precedence
    /// over sender patterns.
    #[must_use]
    pub fn from_predicate(
        predicate: impl Fn(Option<&Origin>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            accept_from: Vec::new(),
            accept: Some(Arc::new(predicate)),
        }
    }

    /// Add sender patterns to an existing policy.
    pub fn with_patterns(
        mut self,
        patterns: &[&str],
        separator: Separator,
    ) -> Result<Self, PatternError> {
        for pattern in patterns {
            self.accept_from.push(compile_cached(pattern, separator)?);
        }
        Ok(self)
    }

    /// Decide whether an event from `sender` with `origin` is delivered.
    #[must_use]
    pub fn accepts(&self, sender: &NodeId, origin: Option<&Origin>) -> bool {
        if let Some(predicate) = &self.accept {
            return predicate(origin);
        }
        if self.accept_from.is_empty() {
            return true;
        }
        self.accept_from
            .iter()
            .any(|matcher| matcher.matches(sender.as_str()))
    }
}

impl std::fmt::Debug for AcceptPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptPolicy")
            .field("accept_from", &self.accept_from.len())
            .field("has_predicate", &self.accept.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_policy_accepts_all() {
        let policy = AcceptPolicy::allow_all();
        assert!(policy.accepts(&NodeId::new("anyone"), None));
    }

    #[test]
    fn test_sender_patterns() {
        let policy = AcceptPolicy::from_patterns(
            &["order-service-*", "admin-*"],
            Separator::Hyphen,
        )
        .unwrap();

        assert!(policy.accepts(&NodeId::new("order-service-v1"), None));
        assert!(policy.accepts(&NodeId::new("admin-root"), None));
        assert!(!policy.accepts(&NodeId::new("inventory-service"), None));
    }

    #[test]
    fn test_predicate_takes_precedence() {
        let policy = AcceptPolicy::from_predicate(|origin| {
            origin.is_some_and(|o| o.source_type == "sensor")
        })
        .with_patterns(&["trusted-*"], Separator::Hyphen)
        .unwrap();

        let sensor = Origin {
            source_id: "s1".into(),
            source_type: "sensor".into(),
        };
        let gateway = Origin {
            source_id: "g1".into(),
            source_type: "gateway".into(),
        };

        // The predicate decides even though the sender matches a pattern.
        assert!(policy.accepts(&NodeId::new("trusted-a"), Some(&sensor)));
        assert!(!policy.accepts(&NodeId::new("trusted-a"), Some(&gateway)));
        assert!(!policy.accepts(&NodeId::new("trusted-a"), None));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        assert!(AcceptPolicy::from_patterns(&["{"], Separator::Dot).is_err());
    }
}
