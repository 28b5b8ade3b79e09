//! Authentication-related data models.

use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

/// Request model for user login
#[derive(Serialize, Deserialize, Apiv2Schema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response model for login attempts
#[derive(Serialize, Deserialize, Apiv2Schema)]
pub struct LoginResponse {
    pub success: bool,
    pub token: Option<String>,
    pub session_id: Option<String>,
    /// Set when the login was flagged for review; the login still succeeds
    pub flagged: bool,
    pub message: String,
}

/// Response model for logout
#[derive(Serialize, Deserialize, Apiv2Schema)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}
