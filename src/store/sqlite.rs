//! SQLite storage backend built on `sqlx`.

use super::{LocationRepository, SessionRepository, StoreError, StoreResult};
use crate::models::{LocationObservation, Session, SessionStatus};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::instrument;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS user_sessions (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        external_session_token TEXT NOT NULL UNIQUE,
        device_info TEXT,
        ip_address TEXT,
        location TEXT,
        is_mobile INTEGER NOT NULL DEFAULT 0,
        browser_name TEXT,
        browser_version TEXT,
        os_name TEXT,
        os_version TEXT,
        status TEXT NOT NULL,
        last_activity TEXT NOT NULL,
        created_at TEXT NOT NULL,
        expires_at TEXT,
        revocation_reason TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_user_sessions_user_id ON user_sessions(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_user_sessions_status ON user_sessions(status)",
    r#"
    CREATE TABLE IF NOT EXISTS session_locations (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        session_id TEXT NOT NULL REFERENCES user_sessions(id) ON DELETE CASCADE,
        ip_address TEXT NOT NULL,
        country_code TEXT,
        country_name TEXT,
        region_name TEXT,
        city TEXT,
        latitude REAL,
        longitude REAL,
        is_suspicious INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_session_locations_session_id ON session_locations(session_id)",
    "CREATE INDEX IF NOT EXISTS idx_session_locations_user_id ON session_locations(user_id)",
];

const SESSION_COLUMNS: &str = "id, user_id, external_session_token, device_info, ip_address, \
     location, is_mobile, browser_name, browser_version, os_name, os_version, status, \
     last_activity, created_at, expires_at, revocation_reason";

const LOCATION_COLUMNS: &str = "id, user_id, session_id, ip_address, country_code, \
     country_name, region_name, city, latitude, longitude, is_suspicious, created_at";

/// Session and location tables in a SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the pool and create the schema.
    ///
    /// In-memory databases are pinned to a single connection that is never
    /// recycled, since every connection would otherwise see its own database.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let in_memory = database_url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| StoreError::InvalidData(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        tracing::debug!(in_memory, "session store connected");
        Ok(store)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they do not exist
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Drain and close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn encode_time(at: &DateTime<Utc>) -> String {
    // Fixed precision keeps lexical order equal to chronological order.
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(field: &str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("invalid {field}: {e}")))
}

fn decode_id(field: &str, raw: &str) -> StoreResult<Uuid> {
    raw.parse()
        .map_err(|_| StoreError::InvalidData(format!("invalid {field}: {raw}")))
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    external_session_token: String,
    device_info: Option<String>,
    ip_address: Option<String>,
    location: Option<String>,
    is_mobile: i64,
    browser_name: Option<String>,
    browser_version: Option<String>,
    os_name: Option<String>,
    os_version: Option<String>,
    status: String,
    last_activity: String,
    created_at: String,
    expires_at: Option<String>,
    revocation_reason: Option<String>,
}

impl TryFrom<SessionRow> for Session {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> StoreResult<Self> {
        Ok(Session {
            id: decode_id("session id", &row.id)?,
            user_id: row.user_id,
            external_session_token: row.external_session_token,
            device_info: row.device_info,
            ip_address: row.ip_address,
            location: row.location,
            is_mobile: row.is_mobile != 0,
            browser_name: row.browser_name,
            browser_version: row.browser_version,
            os_name: row.os_name,
            os_version: row.os_version,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::InvalidData(format!("invalid status: {e}")))?,
            last_activity: decode_time("last_activity", &row.last_activity)?,
            created_at: decode_time("created_at", &row.created_at)?,
            expires_at: row
                .expires_at
                .map(|raw| decode_time("expires_at", &raw))
                .transpose()?,
            revocation_reason: row.revocation_reason,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LocationRow {
    id: String,
    user_id: String,
    session_id: String,
    ip_address: String,
    country_code: Option<String>,
    country_name: Option<String>,
    region_name: Option<String>,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    is_suspicious: i64,
    created_at: String,
}

impl TryFrom<LocationRow> for LocationObservation {
    type Error = StoreError;

    fn try_from(row: LocationRow) -> StoreResult<Self> {
        Ok(LocationObservation {
            id: decode_id("location id", &row.id)?,
            user_id: row.user_id,
            session_id: decode_id("session id", &row.session_id)?,
            ip_address: row.ip_address,
            country_code: row.country_code,
            country_name: row.country_name,
            region_name: row.region_name,
            city: row.city,
            latitude: row.latitude,
            longitude: row.longitude,
            is_suspicious: row.is_suspicious != 0,
            created_at: decode_time("created_at", &row.created_at)?,
        })
    }
}

impl SqliteStore {
    async fn fetch_sessions(&self, filter: &str, bind: Option<&str>) -> StoreResult<Vec<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM user_sessions {filter} ORDER BY created_at ASC, id ASC"
        );
        let mut query = sqlx::query_as::<_, SessionRow>(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn fetch_locations(&self, filter: &str, bind: &str) -> StoreResult<Vec<LocationObservation>> {
        let sql = format!(
            "SELECT {LOCATION_COLUMNS} FROM session_locations {filter} ORDER BY created_at ASC"
        );
        let rows = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(bind)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[async_trait]
impl SessionRepository for SqliteStore {
    #[instrument(skip(self, session), fields(session_id = %session.id, user_id = %session.user_id))]
    async fn insert_session(&self, session: Session) -> StoreResult<Session> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (
                id, user_id, external_session_token, device_info, ip_address,
                location, is_mobile, browser_name, browser_version, os_name, os_version,
                status, last_activity, created_at, expires_at, revocation_reason
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.id.to_string())
        .bind(&session.user_id)
        .bind(&session.external_session_token)
        .bind(&session.device_info)
        .bind(&session.ip_address)
        .bind(&session.location)
        .bind(if session.is_mobile { 1_i64 } else { 0 })
        .bind(&session.browser_name)
        .bind(&session.browser_version)
        .bind(&session.os_name)
        .bind(&session.os_version)
        .bind(session.status.as_str())
        .bind(encode_time(&session.last_activity))
        .bind(encode_time(&session.created_at))
        .bind(session.expires_at.as_ref().map(encode_time))
        .bind(&session.revocation_reason)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    #[instrument(skip(self))]
    async fn get_session(&self, id: Uuid) -> StoreResult<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM user_sessions WHERE id = ?");
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, token))]
    async fn get_session_by_token(&self, token: &str) -> StoreResult<Option<Session>> {
        let sql =
            format!("SELECT {SESSION_COLUMNS} FROM user_sessions WHERE external_session_token = ?");
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn list_sessions_for_user(&self, user_id: &str) -> StoreResult<Vec<Session>> {
        self.fetch_sessions("WHERE user_id = ?", Some(user_id)).await
    }

    #[instrument(skip(self))]
    async fn list_sessions_by_status(&self, status: SessionStatus) -> StoreResult<Vec<Session>> {
        self.fetch_sessions("WHERE status = ?", Some(status.as_str()))
            .await
    }

    async fn list_all_sessions(&self) -> StoreResult<Vec<Session>> {
        self.fetch_sessions("", None).await
    }

    #[instrument(skip(self, revocation_reason))]
    async fn update_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        revocation_reason: Option<String>,
    ) -> StoreResult<Option<Session>> {
        let reason = if status == SessionStatus::Revoked {
            revocation_reason
        } else {
            None
        };

        let leaves_revoked = status != SessionStatus::Revoked;
        let sql = if leaves_revoked {
            "UPDATE user_sessions SET status = ?, revocation_reason = ? WHERE id = ? AND status <> ?"
        } else {
            "UPDATE user_sessions SET status = ?, revocation_reason = ? WHERE id = ?"
        };

        let mut query = sqlx::query(sql)
            .bind(status.as_str())
            .bind(reason)
            .bind(id.to_string());
        if leaves_revoked {
            query = query.bind(SessionStatus::Revoked.as_str());
        }
        // Zero rows: unknown id, or a revoked row the guard kept as is.
        let result = query.execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_session(id).await
    }

    #[instrument(skip(self, token))]
    async fn touch_session(&self, token: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE user_sessions SET last_activity = ? WHERE external_session_token = ?")
                .bind(encode_time(&at))
                .bind(token)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LocationRepository for SqliteStore {
    #[instrument(skip(self, observation), fields(session_id = %observation.session_id))]
    async fn insert_location(
        &self,
        observation: LocationObservation,
    ) -> StoreResult<LocationObservation> {
        sqlx::query(
            r#"
            INSERT INTO session_locations (
                id, user_id, session_id, ip_address, country_code, country_name,
                region_name, city, latitude, longitude, is_suspicious, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(observation.id.to_string())
        .bind(&observation.user_id)
        .bind(observation.session_id.to_string())
        .bind(&observation.ip_address)
        .bind(&observation.country_code)
        .bind(&observation.country_name)
        .bind(&observation.region_name)
        .bind(&observation.city)
        .bind(observation.latitude)
        .bind(observation.longitude)
        .bind(if observation.is_suspicious { 1_i64 } else { 0 })
        .bind(encode_time(&observation.created_at))
        .execute(&self.pool)
        .await?;

        Ok(observation)
    }

    async fn list_locations_for_session(
        &self,
        session_id: Uuid,
    ) -> StoreResult<Vec<LocationObservation>> {
        self.fetch_locations("WHERE session_id = ?", &session_id.to_string())
            .await
    }

    async fn list_locations_for_user(&self, user_id: &str) -> StoreResult<Vec<LocationObservation>> {
        self.fetch_locations("WHERE user_id = ?", user_id).await
    }

    #[instrument(skip(self))]
    async fn mark_location_suspicious(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let session_id: Option<String> =
            sqlx::query_scalar("SELECT session_id FROM session_locations WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *tx)
                .await?;

        let Some(session_id) = session_id else {
            tx.rollback().await?;
            return Ok(false);
        };

        sqlx::query("UPDATE session_locations SET is_suspicious = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE user_sessions SET status = ?, revocation_reason = NULL \
             WHERE id = ? AND status <> ?",
        )
        .bind(SessionStatus::Suspicious.as_str())
        .bind(&session_id)
        .bind(SessionStatus::Revoked.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
