//! # Pattern Compilation
//!
//! Transforms a subscription expression into an anchored regular expression:
//! regex metacharacters are escaped, `{a,b}` becomes a non-capturing
//! alternation, and each `*` becomes one non-separator segment.

use mesh_types::Separator;
use regex::Regex;
use thiserror::Error;

/// Errors raised at `on(...)` registration for bad subscription expressions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern is the empty string.
    #[error("Empty pattern")]
    Empty,

    /// `{a,,b}` or `{}` — an alternative with no content.
    #[error("Empty alternative in pattern `{pattern}`")]
    EmptyAlternative { pattern: String },

    /// `{` without a matching `}`.
    #[error("Unterminated brace in pattern `{pattern}`")]
    UnterminatedBrace { pattern: String },

    /// `}` without an opening `{`, or a nested `{`.
    #[error("Unbalanced brace in pattern `{pattern}`")]
    UnbalancedBrace { pattern: String },

    /// A construct the grammar does not define (e.g. `*` inside braces).
    #[error("Unsupported construct in pattern `{pattern}`: {detail}")]
    Unsupported { pattern: String, detail: String },

    /// The generated expression failed to compile. Not expected in practice.
    #[error("Pattern `{pattern}` did not compile: {detail}")]
    Regex { pattern: String, detail: String },
}

/// Compile a subscription expression into an anchored regex.
///
/// The global wildcard (`*` as the whole pattern) is handled by the caller;
/// this function always produces a segment-level matcher.
pub fn compile_regex(pattern: &str, separator: Separator) -> Result<Regex, PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }

    let segment_class = match separator {
        Separator::Dot => "([^.]+)",
        Separator::Hyphen => "([^\\-]+)",
    };

    let mut source = String::with_capacity(pattern.len() * 2);
    source.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => source.push_str(segment_class),
            '{' => {
                let mut alternatives: Vec<String> = Vec::new();
                let mut current = String::new();
                let mut closed = false;

                for inner in chars.by_ref() {
                    match inner {
                        '}' => {
                            alternatives.push(current.clone());
                            closed = true;
                            break;
                        }
                        ',' => {
                            alternatives.push(std::mem::take(&mut current));
                        }
                        '{' => {
                            return Err(PatternError::UnbalancedBrace {
                                pattern: pattern.to_string(),
                            });
                        }
                        '*' => {
                            return Err(PatternError::Unsupported {
                                pattern: pattern.to_string(),
                                detail: "wildcard inside alternatives".to_string(),
                            });
                        }
                        other => current.push(other),
                    }
                }

                if !closed {
                    return Err(PatternError::UnterminatedBrace {
                        pattern: pattern.to_string(),
                    });
                }
                if alternatives.iter().any(String::is_empty) {
                    return Err(PatternError::EmptyAlternative {
                        pattern: pattern.to_string(),
                    });
                }

                source.push_str("(?:");
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        source.push('|');
                    }
                    source.push_str(&regex::escape(alt));
                }
                source.push(')');
            }
            '}' => {
                return Err(PatternError::UnbalancedBrace {
                    pattern: pattern.to_string(),
                });
            }
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }

    source.push('$');

    Regex::new(&source).map_err(|e| PatternError::Regex {
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })
}
