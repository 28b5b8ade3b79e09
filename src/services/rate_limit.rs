//! Fixed-window attempt limiter for the login endpoint.

use crate::config::RateLimitConfig;
use actix_web::{HttpRequest, HttpResponse};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

/// In-memory attempt counter keyed by client IP, email or user id
#[derive(Clone)]
pub struct SimpleRateLimiter {
    config: RateLimitConfig,
    storage: Arc<Mutex<HashMap<String, (usize, Instant)>>>,
}

impl SimpleRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            storage: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count an attempt for `key`.
    ///
    /// Returns `true` if the attempt is allowed, `false` if the key is over its limit.
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let period = Duration::from_secs(self.config.period_seconds);
        let now = Instant::now();
        // A poisoned lock only means another request panicked mid-update; the counts are still usable.
        let mut storage = self
            .storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        storage.retain(|_, (_, window_start)| now.duration_since(*window_start) < period);

        let (count, _) = storage.entry(key.to_string()).or_insert((0, now));
        if *count >= self.config.max_attempts {
            return false;
        }
        *count += 1;
        true
    }
}

/// Apply the limiter to a request, keyed by client IP
pub fn rate_limit_middleware(
    req: &HttpRequest,
    limiter: &SimpleRateLimiter,
) -> Result<(), HttpResponse> {
    let ip = crate::utils::extract_client_ip(req);

    if !limiter.check_rate_limit(&ip) {
        return Err(HttpResponse::TooManyRequests().json(serde_json::json!({
            "error": "Too Many Requests",
            "message": "Too many login attempts. Please try again later."
        })));
    }

    Ok(())
}
