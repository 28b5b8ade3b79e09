//! Login rate limiting configuration.

use std::env;

/// Configuration for the login attempt limiter
#[derive(Clone)]
pub struct RateLimitConfig {
    pub max_attempts: usize,
    pub period_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            period_seconds: 60,
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let max_attempts = env::var("LOGIN_RATE_LIMIT_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let period_seconds = env::var("LOGIN_RATE_LIMIT_PERIOD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            max_attempts,
            period_seconds,
        }
    }
}
