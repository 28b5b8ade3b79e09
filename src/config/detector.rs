//! Suspicious-session detector thresholds.

use std::env;

/// Policy values for the per-login checks and the history sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Logins from a different location inside this many minutes are impossible travel
    pub travel_window_minutes: i64,
    /// Only sessions created this recently are compared against a new login
    pub lookback_hours: i64,
    /// A new device is unusual once the user already has this many distinct devices
    pub known_device_threshold: usize,
    pub device_churn_enabled: bool,
    pub device_churn_minutes: i64,
    /// Flag when the number of other active sessions exceeds this
    pub max_active_sessions: usize,
    pub sweep_min_sessions: usize,
    /// Flag all active sessions when distinct locations exceed this
    pub max_distinct_locations: usize,
    /// Assumed usage span for a session with no recorded activity after login
    pub default_session_window_minutes: i64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            travel_window_minutes: 30,
            lookback_hours: 24,
            known_device_threshold: 3,
            device_churn_enabled: true,
            device_churn_minutes: 10,
            max_active_sessions: 5,
            sweep_min_sessions: 3,
            max_distinct_locations: 5,
            default_session_window_minutes: 30,
        }
    }
}

impl DetectorConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            travel_window_minutes: parse_var(
                "DETECTOR_TRAVEL_WINDOW_MINUTES",
                defaults.travel_window_minutes,
            ),
            lookback_hours: parse_var("DETECTOR_LOOKBACK_HOURS", defaults.lookback_hours),
            known_device_threshold: parse_var(
                "DETECTOR_KNOWN_DEVICE_THRESHOLD",
                defaults.known_device_threshold,
            ),
            device_churn_enabled: env::var("DETECTOR_DEVICE_CHURN_ENABLED")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(defaults.device_churn_enabled),
            device_churn_minutes: parse_var(
                "DETECTOR_DEVICE_CHURN_MINUTES",
                defaults.device_churn_minutes,
            ),
            max_active_sessions: parse_var(
                "DETECTOR_MAX_ACTIVE_SESSIONS",
                defaults.max_active_sessions,
            ),
            sweep_min_sessions: parse_var("DETECTOR_SWEEP_MIN_SESSIONS", defaults.sweep_min_sessions),
            max_distinct_locations: parse_var(
                "DETECTOR_MAX_DISTINCT_LOCATIONS",
                defaults.max_distinct_locations,
            ),
            default_session_window_minutes: parse_var(
                "DETECTOR_DEFAULT_SESSION_WINDOW_MINUTES",
                defaults.default_session_window_minutes,
            ),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
