//! # Selectors
//!
//! A selector is a pure function over a node's state snapshot, paired with
//! a stable key that identifies it for memoisation.

use serde_json::Value;
use std::sync::Arc;

type SelectorFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// A keyed state selector.
#[derive(Clone)]
pub struct Selector {
    key: String,
    select: SelectorFn,
}

impl Selector {
    /// Create a selector. The key must be stable for the selector's
    /// behaviour: two selectors with the same key are assumed
    /// interchangeable by the cache.
    pub fn new(key: impl Into<String>, select: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self {
            key: key.into(),
            select: Arc::new(select),
        }
    }

    /// The whole-snapshot selector.
    #[must_use]
    pub fn identity() -> Self {
        Self::new("identity", Clone::clone)
    }

    /// A selector reading one top-level field of the snapshot.
    #[must_use]
    pub fn field(name: &str) -> Self {
        let field = name.to_string();
        Self::new(format!("field:{name}"), move |state| {
            state.get(&field).cloned().unwrap_or(Value::Null)
        })
    }

    /// The memoisation key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Apply the selector to a snapshot.
    #[must_use]
    pub fn apply(&self, state: &Value) -> Value {
        (self.select)(state)
    }
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Selector({:?})", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity() {
        let state = json!({"a": 1});
        assert_eq!(Selector::identity().apply(&state), state);
    }

    #[test]
    fn test_field_selector() {
        let state = json!({"inventory": {"apples": 3}});
        let selector = Selector::field("inventory");
        assert_eq!(selector.apply(&state), json!({"apples": 3}));
        assert_eq!(selector.key(), "field:inventory");
    }

    #[test]
    fn test_field_selector_missing_is_null() {
        let selector = Selector::field("missing");
        assert_eq!(selector.apply(&json!({})), Value::Null);
    }
}
