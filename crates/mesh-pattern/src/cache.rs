//! # Compile Cache
//!
//! Process-wide cache of compiled patterns keyed by `(pattern, separator)`.
//! Hot patterns (accept policies recompiled per node, repeated
//! subscriptions) hit the cache instead of the regex compiler.

use crate::compile::PatternError;
use crate::matcher::Matcher;
use dashmap::DashMap;
use mesh_types::Separator;
use regex::Regex;
use std::sync::OnceLock;

fn cache() -> &'static DashMap<(String, Separator), Regex> {
    static CACHE: OnceLock<DashMap<(String, Separator), Regex>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

/// Compile a pattern, reusing a previously compiled regex when available.
///
/// Compile failures are not cached; a bad pattern fails the same way on
/// every registration attempt.
pub fn compile_cached(pattern: &str, separator: Separator) -> Result<Matcher, PatternError> {
    if pattern == "*" {
        return Ok(Matcher::All);
    }

    let key = (pattern.to_string(), separator);
    if let Some(regex) = cache().get(&key) {
        return Ok(Matcher::Compiled {
            pattern: pattern.to_string(),
            regex: regex.clone(),
        });
    }

    let matcher = Matcher::compile(pattern, separator)?;
    if let Matcher::Compiled { regex, .. } = &matcher {
        cache().insert(key, regex.clone());
    }
    Ok(matcher)
}
