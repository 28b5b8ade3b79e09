//! Session records and their status lifecycle.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Status of a tracked login session.
///
/// ```text
/// active ──► suspicious ──► revoked
///   │  └──► inactive ──────► revoked
///   └──────────────────────► revoked
/// ```
///
/// `Revoked` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Inactive,
    Revoked,
    Suspicious,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Revoked => "revoked",
            Self::Suspicious => "suspicious",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }

    /// Whether a session in this status may move to `next`.
    ///
    /// Revoking a revoked session is allowed so that revocation stays idempotent.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        match self {
            Self::Revoked => next == Self::Revoked,
            _ => true,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "revoked" => Ok(Self::Revoked),
            "suspicious" => Ok(Self::Suspicious),
            other => Err(format!("unknown session status '{other}'")),
        }
    }
}

/// Browser and operating system details derived from a user-agent string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub is_mobile: bool,
    pub browser_name: Option<String>,
    pub browser_version: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
}

/// One authenticated login context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub external_session_token: String,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
    pub is_mobile: bool,
    pub browser_name: Option<String>,
    pub browser_version: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub status: SessionStatus,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,
}

impl Session {
    /// Build a fresh `active` session from login input
    pub fn from_new(new: NewSession, profile: DeviceProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            external_session_token: new.token,
            device_info: new.device_info,
            ip_address: new.ip_address,
            location: new.location,
            is_mobile: profile.is_mobile,
            browser_name: profile.browser_name,
            browser_version: profile.browser_version,
            os_name: profile.os_name,
            os_version: profile.os_version,
            status: SessionStatus::Active,
            last_activity: now,
            created_at: now,
            expires_at: new.expires_at,
            revocation_reason: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Whether the session can still authenticate requests
    pub fn is_live(&self) -> bool {
        matches!(self.status, SessionStatus::Active | SessionStatus::Suspicious)
    }

    /// Time span during which the session was in use.
    ///
    /// A session that never saw activity after login is assumed to have been
    /// used for `untouched_window` after creation.
    pub fn activity_window(&self, untouched_window: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
        // last_activity equals created_at until the first touch.
        let end = if self.last_activity > self.created_at {
            self.last_activity
        } else {
            self.created_at + untouched_window
        };
        (self.created_at, end)
    }
}

/// Input for creating a session at login
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSession {
    pub user_id: String,
    pub token: String,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewSession {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
            ..Default::default()
        }
    }

    pub fn with_device_info(mut self, device_info: Option<String>) -> Self {
        self.device_info = device_info;
        self
    }

    pub fn with_ip_address(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn with_expires_at(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }
}
