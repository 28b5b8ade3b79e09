//! Logging and metrics configuration.

use std::env;

#[derive(Clone)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
    /// Emit logs as JSON lines instead of the human-readable format
    pub json_logs: bool,
    /// Filter used when `RUST_LOG` is unset
    pub default_log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            json_logs: true,
            default_log_filter: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let metrics_enabled = env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let json_logs = env::var("LOG_FORMAT")
            .map(|v| v.to_lowercase() != "pretty")
            .unwrap_or(true);

        let default_log_filter = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            metrics_enabled,
            json_logs,
            default_log_filter,
        }
    }
}
