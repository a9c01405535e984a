//! # Bounded Exponential Back-Off
//!
//! Retry pacing for transient fabric failures: subscription
//! re-establishment after reconnect and transient publish retries.

use std::time::Duration;

/// Bounded exponential back-off.
///
/// Delays double from `base` up to `cap`; after `max_attempts` the
/// sequence ends and the caller gives up.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl Backoff {
    /// Default base delay.
    pub const DEFAULT_BASE: Duration = Duration::from_millis(50);

    /// Default delay cap.
    pub const DEFAULT_CAP: Duration = Duration::from_secs(5);

    /// Default attempt bound.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

    /// Create a back-off with default pacing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(
            Self::DEFAULT_BASE,
            Self::DEFAULT_CAP,
            Self::DEFAULT_MAX_ATTEMPTS,
        )
    }

    /// Create a back-off with explicit pacing.
    #[must_use]
    pub fn with_config(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
            attempt: 0,
        }
    }

    /// The delay before the next attempt, or `None` when attempts are
    /// exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let exponent = self.attempt.min(20);
        self.attempt += 1;
        let delay = self
            .base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.cap)
            .min(self.cap);
        Some(delay)
    }

    /// Attempts consumed so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Reset after a success.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
