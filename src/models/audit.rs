//! Audit logging data structures and types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Types of authentication and session events for audit logging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventType {
    LoginSuccess,
    LoginFailure,
    Logout,
    SessionCreated,
    SuspiciousActivity,
    SessionRevoked,
    SessionsRevokedForUser,
    SessionMarkedSuspicious,
    RateLimitExceeded,
}

/// Outcomes of authentication events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventOutcome {
    Success,
    Failure,
    Flagged,
}

/// Structured audit log entry for authentication and session events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthAuditEvent {
    pub event_type: AuthEventType,
    pub outcome: AuthEventOutcome,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
    pub method: Option<String>,
    pub endpoint: Option<String>,
    pub session_id: Option<String>,
    pub request_id: Option<String>,
    pub additional_context: Option<String>,
}

impl AuthAuditEvent {
    pub fn new(event_type: AuthEventType, outcome: AuthEventOutcome) -> Self {
        Self {
            event_type,
            outcome,
            timestamp: Utc::now(),
            ip_address: None,
            user_agent: None,
            user_id: None,
            method: None,
            endpoint: None,
            session_id: None,
            request_id: None,
            additional_context: None,
        }
    }

    /// Attach the HTTP request that triggered the event
    pub fn with_request(mut self, ip_address: String, method: String, endpoint: String) -> Self {
        self.ip_address = Some(ip_address);
        self.method = Some(method);
        self.endpoint = Some(endpoint);
        self
    }

    pub fn with_ip_address(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.additional_context = context;
        self
    }

    /// Log the audit event using structured logging
    pub fn log(&self) {
        info!(
            target: "auth_audit",
            event_type = ?self.event_type,
            outcome = ?self.outcome,
            timestamp = %self.timestamp,
            ip_address = ?self.ip_address,
            user_agent = ?self.user_agent,
            user_id = ?self.user_id,
            method = ?self.method,
            endpoint = ?self.endpoint,
            session_id = ?self.session_id,
            request_id = ?self.request_id,
            additional_context = ?self.additional_context,
            "Authentication audit event"
        );
    }
}
