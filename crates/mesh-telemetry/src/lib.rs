//! # Mesh Telemetry
//!
//! Structured logging for mesh runtimes: one `init_telemetry` call installs
//! a `tracing` subscriber with env-filterable levels and optional JSON
//! output for log shipping.
//!
//! ```rust,ignore
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config).expect("telemetry init");
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;

pub use config::TelemetryConfig;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, falling back to the
/// configured level. Call once per process; a second call fails.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let result = if config.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;
    tracing::debug!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "eventmesh");
        assert_eq!(config.log_level, "info");
    }
}
