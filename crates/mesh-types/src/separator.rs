//! # Event-Type Separator
//!
//! Event types are segmented identifiers (`order.created`, `admin-root`).
//! The separator character is configurable but fixed for the lifetime of a
//! runtime; every matcher and subject mapping in the process uses the same
//! one.

use serde::{Deserialize, Serialize};

/// The segment separator used by event types and subscription patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    /// `order.created`
    #[default]
    Dot,
    /// `order-created`
    Hyphen,
}

impl Separator {
    /// The separator as a char.
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::Dot => '.',
            Self::Hyphen => '-',
        }
    }

    /// The separator as a one-character string slice.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dot => ".",
            Self::Hyphen => "-",
        }
    }

    /// Split an event type into its segments.
    pub fn segments(self, event_type: &str) -> impl Iterator<Item = &str> {
        event_type.split(self.as_char())
    }
}
