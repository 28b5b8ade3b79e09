//! Persistence for sessions and location observations.
//!
//! The detector and lifecycle manager only see the [`SessionRepository`] and
//! [`LocationRepository`] traits. Two backends implement both:
//! [`MemoryStore`] for tests and single-process deployments, and
//! [`SqliteStore`] backed by `sqlx`.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::{LocationObservation, Session, SessionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("session token is already in use")]
    DuplicateToken,

    #[error("conflicting record: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid stored data: {0}")]
    InvalidData(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                // SQLite names the column: "UNIQUE constraint failed: <table>.<column>"
                if db_err.message().contains("external_session_token") {
                    return Self::DuplicateToken;
                }
                return Self::Conflict(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                return Self::NotFound("owning session".to_string());
            }
        }
        Self::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Session rows keyed by id, unique by external token
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Fails with [`StoreError::DuplicateToken`] if the external token is taken.
    async fn insert_session(&self, session: Session) -> StoreResult<Session>;

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<Session>>;

    async fn get_session_by_token(&self, token: &str) -> StoreResult<Option<Session>>;

    /// All of a user's sessions, oldest first
    async fn list_sessions_for_user(&self, user_id: &str) -> StoreResult<Vec<Session>>;

    async fn list_sessions_by_status(&self, status: SessionStatus) -> StoreResult<Vec<Session>>;

    async fn list_all_sessions(&self) -> StoreResult<Vec<Session>>;

    /// Set the status of a session. The revocation reason is stored only when
    /// the new status is `revoked` and cleared otherwise.
    ///
    /// `revoked` is terminal: moving a revoked session to any other status is
    /// refused in the same step as the write. Returns the updated row, or
    /// `None` if the session does not exist or the transition was refused.
    async fn update_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        revocation_reason: Option<String>,
    ) -> StoreResult<Option<Session>>;

    /// Bump `last_activity`; returns whether a session matched the token
    async fn touch_session(&self, token: &str, at: DateTime<Utc>) -> StoreResult<bool>;
}

/// Location observations, each owned by one session
#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Fails with [`StoreError::NotFound`] if the owning session does not exist.
    async fn insert_location(&self, observation: LocationObservation)
    -> StoreResult<LocationObservation>;

    async fn list_locations_for_session(&self, session_id: Uuid)
    -> StoreResult<Vec<LocationObservation>>;

    async fn list_locations_for_user(&self, user_id: &str) -> StoreResult<Vec<LocationObservation>>;

    /// Flag an observation and its owning session as suspicious in one atomic
    /// step. A revoked owning session keeps its status. Returns false if the
    /// observation does not exist.
    async fn mark_location_suspicious(&self, id: Uuid) -> StoreResult<bool>;
}
