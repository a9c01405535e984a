//! # Subject Naming
//!
//! Event types map onto fabric subjects with a fixed scheme:
//!
//! - ordinary events: `events.<type-with-separators-normalised-to-dots>`
//! - broadcast fan-out: `events.broadcast`
//! - directed sends: `node.<node-id>`
//! - request/reply synthetics: `_signal.<token>` (verbatim, never
//!   re-separated — tokens may contain separator characters)
//! - flow-balance system events: `system.flow-balance.<pattern>`
//!
//! Pattern subscriptions map to fabric wildcard subjects where the fabric
//! supports them (`*` one token, `>` tail); alternation patterns fall back
//! to the global event sink plus local pattern filtering.

use mesh_types::{NodeId, Separator, BROADCAST_SUBJECT, SIGNAL_SUBJECT_PREFIX};

/// The global sink covering every ordinary event subject.
pub const EVENTS_SINK: &str = "events.>";

/// The sink covering every flow-balance system subject.
pub const SYSTEM_SINK: &str = "system.flow-balance.>";

/// Subject for an ordinary emit of the given event type.
#[must_use]
pub fn event_subject(event_type: &str, separator: Separator) -> String {
    if event_type.starts_with(SIGNAL_SUBJECT_PREFIX) {
        return event_type.to_string();
    }
    format!("events.{}", normalise(event_type, separator))
}

/// Subject for a directed send to a node.
#[must_use]
pub fn node_subject(node_id: &NodeId) -> String {
    format!("node.{node_id}")
}

/// Subject for a completion signal token.
#[must_use]
pub fn signal_subject(token: &str) -> String {
    format!("{SIGNAL_SUBJECT_PREFIX}{token}")
}

/// Subject for a flow-balance emission of the given detected pattern.
#[must_use]
pub fn flow_balance_subject(pattern: &str) -> String {
    format!("system.flow-balance.{pattern}")
}

/// Whether a subject routes through the fabric's durable channel.
///
/// Subjects under `state.` or `events.`, or containing `.persistent.`,
/// are durable; everything else may be best-effort.
#[must_use]
pub fn subject_is_durable(subject: &str) -> bool {
    subject.starts_with("state.")
        || subject.starts_with("events.")
        || subject.contains(".persistent.")
}

/// The fabric subjects a subscription pattern listens on.
///
/// `pattern` is `None` for function matchers, which could match anything
/// and therefore listen on the global sinks.
#[must_use]
pub fn subjects_for_pattern(pattern: Option<&str>, separator: Separator) -> Vec<String> {
    let Some(pattern) = pattern else {
        return vec![EVENTS_SINK.to_string(), SYSTEM_SINK.to_string()];
    };

    if pattern == "*" {
        return vec![EVENTS_SINK.to_string(), SYSTEM_SINK.to_string()];
    }
    if pattern.starts_with(SIGNAL_SUBJECT_PREFIX) {
        return vec![pattern.to_string()];
    }
    if pattern.contains('{') {
        // Alternation has no fabric wildcard equivalent; sink + local filter.
        return vec![EVENTS_SINK.to_string()];
    }

    let dotted = normalise(pattern, separator);
    let mut subjects = vec![format!("events.{dotted}")];

    // Flow-balance emissions carry types `node.down` / `system.down` but
    // travel on system subjects; patterns that can reach them need the
    // system sink as well.
    if dotted.starts_with("node.") || dotted.starts_with("system.") {
        subjects.push(SYSTEM_SINK.to_string());
    }

    subjects
}

/// Recover the event-type form of an ordinary event subject.
#[must_use]
pub fn subject_to_event_type(subject: &str, separator: Separator) -> Option<String> {
    if subject == BROADCAST_SUBJECT {
        return None;
    }
    let dotted = subject.strip_prefix("events.")?;
    Some(match separator {
        Separator::Dot => dotted.to_string(),
        Separator::Hyphen => dotted.replace('.', "-"),
    })
}

/// Test a subject against a subject pattern with fabric wildcards.
///
/// `*` matches exactly one token; `>` matches one or more trailing tokens
/// and is only valid in tail position.
#[must_use]
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.').peekable();
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (None, None) => return true,
            (Some(">"), Some(_)) => return pattern_tokens.peek().is_none(),
            (Some("*"), Some(_)) => {}
            (Some(p), Some(s)) if p == s => {}
            _ => return false,
        }
    }
}

fn normalise(event_type: &str, separator: Separator) -> String {
    match separator {
        Separator::Dot => event_type.to_string(),
        Separator::Hyphen => event_type.replace('-', "."),
    }
}
