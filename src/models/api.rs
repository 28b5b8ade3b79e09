//! API response models for standard and session endpoints.

use crate::models::{LocationObservation, Session};
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

/// Response model for the health check endpoint
#[derive(Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response model for the version information endpoint
#[derive(Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct VersionResponse {
    pub version: String,
    pub commit: String,
    pub build_time: String,
}

/// Session as shown to its owner. Revocation reasons are never exposed here.
#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct SessionView {
    pub id: String,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
    pub is_mobile: bool,
    pub browser_name: Option<String>,
    pub browser_version: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub status: String,
    /// RFC 3339 timestamps
    pub last_activity: String,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub is_current: bool,
}

impl SessionView {
    pub fn from_session(session: &Session, current_session_id: &uuid::Uuid) -> Self {
        Self {
            id: session.id.to_string(),
            device_info: session.device_info.clone(),
            ip_address: session.ip_address.clone(),
            location: session.location.clone(),
            is_mobile: session.is_mobile,
            browser_name: session.browser_name.clone(),
            browser_version: session.browser_version.clone(),
            os_name: session.os_name.clone(),
            os_version: session.os_version.clone(),
            status: session.status.to_string(),
            last_activity: session.last_activity.to_rfc3339(),
            created_at: session.created_at.to_rfc3339(),
            expires_at: session.expires_at.map(|t| t.to_rfc3339()),
            is_current: session.id == *current_session_id,
        }
    }
}

/// Full session record for operators
#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct AdminSessionView {
    pub id: String,
    pub user_id: String,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub location: Option<String>,
    pub is_mobile: bool,
    pub browser_name: Option<String>,
    pub os_name: Option<String>,
    pub status: String,
    pub last_activity: String,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub revocation_reason: Option<String>,
}

impl From<&Session> for AdminSessionView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.to_string(),
            user_id: session.user_id.clone(),
            device_info: session.device_info.clone(),
            ip_address: session.ip_address.clone(),
            location: session.location.clone(),
            is_mobile: session.is_mobile,
            browser_name: session.browser_name.clone(),
            os_name: session.os_name.clone(),
            status: session.status.to_string(),
            last_activity: session.last_activity.to_rfc3339(),
            created_at: session.created_at.to_rfc3339(),
            expires_at: session.expires_at.map(|t| t.to_rfc3339()),
            revocation_reason: session.revocation_reason.clone(),
        }
    }
}

/// Location observation for operators
#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct LocationView {
    pub id: String,
    pub session_id: String,
    pub ip_address: String,
    pub country_code: Option<String>,
    pub country_name: Option<String>,
    pub region_name: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_suspicious: bool,
    pub created_at: String,
}

impl From<&LocationObservation> for LocationView {
    fn from(obs: &LocationObservation) -> Self {
        Self {
            id: obs.id.to_string(),
            session_id: obs.session_id.to_string(),
            ip_address: obs.ip_address.clone(),
            country_code: obs.country_code.clone(),
            country_name: obs.country_name.clone(),
            region_name: obs.region_name.clone(),
            city: obs.city.clone(),
            latitude: obs.latitude,
            longitude: obs.longitude,
            is_suspicious: obs.is_suspicious,
            created_at: obs.created_at.to_rfc3339(),
        }
    }
}

/// Optional reason supplied with an admin revocation
#[derive(Debug, Clone, Default, Serialize, Deserialize, Apiv2Schema)]
pub struct RevokeQuery {
    pub reason: Option<String>,
}

/// Outcome of a revoke or flag operation
#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct SessionActionResponse {
    pub success: bool,
    pub message: String,
}
