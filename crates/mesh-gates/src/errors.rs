//! # Error Types

use thiserror::Error;

/// Which gate rejected the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Signature verification.
    Authentication,
    /// Payload fingerprint vs. registered schema.
    Schema,
    /// Access policy.
    Authorization,
}

impl Gate {
    /// Parse a gate from its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "authentication" => Some(Self::Authentication),
            "schema" => Some(Self::Schema),
            "authorization" => Some(Self::Authorization),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Authentication => "authentication",
            Self::Schema => "schema",
            Self::Authorization => "authorization",
        };
        f.write_str(name)
    }
}

/// A gate rejected the event; the dispatch pipeline terminates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Security gate `{gate}` rejected event: {reason}")]
pub struct SecurityError {
    /// The rejecting gate.
    pub gate: Gate,
    /// Human-readable rejection reason.
    pub reason: String,
}

impl SecurityError {
    /// Build a rejection for the given gate.
    pub fn new(gate: Gate, reason: impl Into<String>) -> Self {
        Self {
            gate,
            reason: reason.into(),
        }
    }
}
