//! Credential and role configuration for the session endpoints.

use std::{
    collections::{HashMap, HashSet},
    env,
};

/// Login credentials, admin roles and session lifetime
#[derive(Clone, Debug)]
pub struct AuthConfig {
    users: HashMap<String, String>,
    admin_user_ids: HashSet<String>,
    pub session_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            users: HashMap::from([("admin".to_string(), "password123".to_string())]),
            admin_user_ids: HashSet::from(["admin".to_string()]),
            session_ttl_minutes: 12 * 60,
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// `AUTH_USERS` is a comma-separated list of `user:password` pairs and
    /// `ADMIN_USER_IDS` a comma-separated list of user ids.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let users = env::var("AUTH_USERS")
            .ok()
            .map(|v| parse_users(&v))
            .filter(|users| !users.is_empty())
            .unwrap_or(defaults.users);

        let admin_user_ids = env::var("ADMIN_USER_IDS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.admin_user_ids);

        let session_ttl_minutes = env::var("SESSION_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.session_ttl_minutes);

        Self {
            users,
            admin_user_ids,
            session_ttl_minutes,
        }
    }

    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.users.insert(username.to_string(), password.to_string());
        self
    }

    pub fn with_admin(mut self, user_id: &str) -> Self {
        self.admin_user_ids.insert(user_id.to_string());
        self
    }

    pub fn verify_credentials(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|expected| expected == password)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_user_ids.contains(user_id)
    }
}

fn parse_users(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.trim().split_once(':'))
        .filter(|(user, _)| !user.is_empty())
        .map(|(user, password)| (user.to_string(), password.to_string()))
        .collect()
}
