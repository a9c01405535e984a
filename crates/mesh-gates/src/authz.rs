//! # Access Control
//!
//! Rule-based authorization: each rule binds a principal pattern to a set
//! of event-type permissions with an effect and a numeric priority.
//! Lower priority values bind tighter; at equal priority, deny wins.
//! An empty rule set allows everything; a non-empty set with no matching
//! rule denies.

use mesh_pattern::{compile_cached, Matcher, PatternError};
use mesh_types::Separator;
use parking_lot::RwLock;

/// Whether a rule grants or refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

/// One access rule.
pub struct AclRule {
    principal: Matcher,
    permissions: Vec<Matcher>,
    effect: Effect,
    priority: u32,
}

/// The access policy consulted by the authorization gate.
pub struct AccessControl {
    rules: RwLock<Vec<AclRule>>,
    separator: Separator,
}

impl AccessControl {
    /// Create an empty (allow-all) policy.
    #[must_use]
    pub fn new(separator: Separator) -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            separator,
        }
    }

    /// Add an allow rule.
    ///
    /// # Errors
    ///
    /// `PatternError` when the principal or a permission pattern does not
    /// compile; the rule is not installed.
    pub fn allow(
        &self,
        principal: &str,
        permissions: &[&str],
        priority: u32,
    ) -> Result<(), PatternError> {
        self.add_rule(principal, permissions, Effect::Allow, priority)
    }

    /// Add a deny rule.
    pub fn deny(
        &self,
        principal: &str,
        permissions: &[&str],
        priority: u32,
    ) -> Result<(), PatternError> {
        self.add_rule(principal, permissions, Effect::Deny, priority)
    }

    fn add_rule(
        &self,
        principal: &str,
        permissions: &[&str],
        effect: Effect,
        priority: u32,
    ) -> Result<(), PatternError> {
        let principal = compile_cached(principal, self.separator)?;
        let permissions = permissions
            .iter()
            .map(|p| compile_cached(p, self.separator))
            .collect::<Result<Vec<_>, _>>()?;

        self.rules.write().push(AclRule {
            principal,
            permissions,
            effect,
            priority,
        });
        Ok(())
    }

    /// Whether any rules are installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Decide whether `principal` may deliver an event of `event_type`.
    #[must_use]
    pub fn permits(&self, principal: &str, event_type: &str) -> bool {
        let rules = self.rules.read();
        if rules.is_empty() {
            return true;
        }

        // The binding rule is the matching rule with the lowest priority
        // value; deny wins a tie.
        let mut binding: Option<(u32, Effect)> = None;
        for rule in rules.iter() {
            if !rule.principal.matches(principal) {
                continue;
            }
            if !rule.permissions.iter().any(|p| p.matches(event_type)) {
                continue;
            }

            binding = Some(match binding {
                None => (rule.priority, rule.effect),
                Some((current, effect)) => {
                    if rule.priority < current
                        || (rule.priority == current && rule.effect == Effect::Deny)
                    {
                        (rule.priority, rule.effect)
                    } else {
                        (current, effect)
                    }
                }
            });
        }

        matches!(binding, Some((_, Effect::Allow)))
    }
}
