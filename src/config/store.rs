//! Storage backend configuration.

use std::env;

/// Selects the session/location storage backend
#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    /// SQLite connection string; the in-memory store is used when unset
    pub database_url: Option<String>,
}

impl StoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Self { database_url }
    }
}
