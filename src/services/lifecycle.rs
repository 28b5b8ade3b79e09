//! Session lifecycle: creation at login, activity tracking, logout and revocation.

use crate::{
    config::DetectorConfig,
    models::{
        AuthAuditEvent, AuthEventOutcome, AuthEventType, LocationObservation, NewSession, Session,
        SessionStatus, SuspicionVerdict,
    },
    services::{
        detector::{LoginSignals, SuspiciousActivityDetector},
        device::parse_device_profile,
        geo::{GeoLocator, NullGeoLocator},
        metrics::AppMetrics,
    },
    store::{LocationRepository, SessionRepository, StoreError},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const MANUAL_REVOCATION_REASON: &str = "Manual revocation";
pub const REVOKE_ALL_REASON: &str = "Revoked as part of revoking all sessions";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage failed: {0}")]
    Store(#[from] StoreError),
}

/// Owns session state transitions and runs the detector on every new login.
///
/// Detection is fail-open: a storage error while evaluating a login is logged
/// and the login proceeds unflagged.
pub struct SessionManager {
    sessions: Arc<dyn SessionRepository>,
    locations: Arc<dyn LocationRepository>,
    detector: SuspiciousActivityDetector,
    geo: Arc<dyn GeoLocator>,
    metrics: Option<AppMetrics>,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        locations: Arc<dyn LocationRepository>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            detector: SuspiciousActivityDetector::new(sessions.clone(), config),
            sessions,
            locations,
            geo: Arc::new(NullGeoLocator),
            metrics: None,
        }
    }

    pub fn with_geo_locator(mut self, geo: Arc<dyn GeoLocator>) -> Self {
        self.geo = geo;
        self
    }

    pub fn with_metrics(mut self, metrics: AppMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn detector(&self) -> &SuspiciousActivityDetector {
        &self.detector
    }

    /// Record a new login.
    ///
    /// Fails only if the session row itself cannot be written. The returned
    /// session has status `suspicious` if the detector flagged the login.
    pub async fn create_session(&self, mut new: NewSession) -> Result<Session, SessionError> {
        let now = Utc::now();
        let geo = new.ip_address.as_deref().and_then(|ip| self.geo.locate(ip));
        if new.location.is_none() {
            new.location = geo.as_ref().and_then(|g| g.display_string());
        }

        let profile = new
            .device_info
            .as_deref()
            .map(parse_device_profile)
            .unwrap_or_default();
        let mut session = self
            .sessions
            .insert_session(Session::from_new(new, profile, now))
            .await?;

        if let Some(metrics) = &self.metrics {
            metrics.record_session_created();
        }

        let observation = match session.ip_address.clone() {
            Some(ip) => {
                let observation = LocationObservation::new(
                    session.user_id.clone(),
                    session.id,
                    ip,
                    geo.unwrap_or_default(),
                    now,
                );
                match self.locations.insert_location(observation).await {
                    Ok(observation) => Some(observation),
                    Err(e) => {
                        warn!(session_id = %session.id, error = %e, "failed to record location observation");
                        None
                    }
                }
            }
            None => None,
        };

        // Fail-open: a detector error must never block the login.
        let verdict = match self.detector.evaluate(LoginSignals::from_session(&session)).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(
                    user_id = %session.user_id,
                    session_id = %session.id,
                    error = %e,
                    "suspicious activity check failed; allowing login"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_detector_failure();
                }
                SuspicionVerdict::clear()
            }
        };

        if verdict.is_suspicious {
            if self.flag_new_session(&session, observation.as_ref(), &verdict).await {
                session.status = SessionStatus::Suspicious;
            }
            // The sweep runs even when the flag write failed.
            self.sweep_history(&session.user_id).await;
        }

        AuthAuditEvent::new(AuthEventType::SessionCreated, AuthEventOutcome::Success)
            .with_user_id(Some(session.user_id.clone()))
            .with_session_id(Some(session.id.to_string()))
            .with_ip_address(session.ip_address.clone())
            .with_user_agent(session.device_info.clone())
            .log();

        Ok(session)
    }

    async fn flag_new_session(
        &self,
        session: &Session,
        observation: Option<&LocationObservation>,
        verdict: &SuspicionVerdict,
    ) -> bool {
        let mut flagged = false;
        if let Some(observation) = observation {
            match self.locations.mark_location_suspicious(observation.id).await {
                Ok(marked) => flagged = marked,
                Err(e) => {
                    warn!(
                        session_id = %session.id,
                        observation_id = %observation.id,
                        error = %e,
                        "failed to flag location observation"
                    );
                }
            }
        }

        // Without the cascade, flag the session row on its own.
        if !flagged {
            match self
                .sessions
                .update_session_status(session.id, SessionStatus::Suspicious, None)
                .await
            {
                Ok(updated) => flagged = updated.is_some(),
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "failed to flag suspicious session");
                }
            }
        }

        if flagged {
            if let Some(metrics) = &self.metrics {
                metrics.record_session_flagged(verdict.signal);
            }
            AuthAuditEvent::new(AuthEventType::SuspiciousActivity, AuthEventOutcome::Flagged)
                .with_user_id(Some(session.user_id.clone()))
                .with_session_id(Some(session.id.to_string()))
                .with_ip_address(session.ip_address.clone())
                .with_context(verdict.reason.clone())
                .log();
        }
        flagged
    }

    async fn sweep_history(&self, user_id: &str) {
        if let Err(e) = self.detector.analyze_history(user_id).await {
            warn!(user_id = %user_id, error = %e, "session history sweep failed");
        }
    }

    /// Bump `last_activity` for the session behind `token`
    pub async fn touch_activity(&self, token: &str) -> Result<bool, SessionError> {
        self.touch_activity_at(token, Utc::now()).await
    }

    pub async fn touch_activity_at(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        Ok(self.sessions.touch_session(token, at).await?)
    }

    /// Logout: move the session behind `token` to `inactive`.
    ///
    /// Returns false for unknown tokens and revoked sessions.
    pub async fn end_session(&self, token: &str) -> Result<bool, SessionError> {
        let Some(session) = self.sessions.get_session_by_token(token).await? else {
            return Ok(false);
        };
        if !session.status.can_transition_to(SessionStatus::Inactive) {
            return Ok(false);
        }

        // The store re-checks the transition; a revoke may have landed since the read.
        if self
            .sessions
            .update_session_status(session.id, SessionStatus::Inactive, None)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        AuthAuditEvent::new(AuthEventType::Logout, AuthEventOutcome::Success)
            .with_user_id(Some(session.user_id))
            .with_session_id(Some(session.id.to_string()))
            .log();
        Ok(true)
    }

    /// Revoke one session. Revoking an already revoked session succeeds again.
    pub async fn revoke(&self, session_id: Uuid, reason: Option<&str>) -> Result<bool, SessionError> {
        let reason = reason.unwrap_or(MANUAL_REVOCATION_REASON).to_string();
        let Some(updated) = self
            .sessions
            .update_session_status(session_id, SessionStatus::Revoked, Some(reason.clone()))
            .await?
        else {
            return Ok(false);
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_sessions_revoked(1);
        }
        AuthAuditEvent::new(AuthEventType::SessionRevoked, AuthEventOutcome::Success)
            .with_user_id(Some(updated.user_id))
            .with_session_id(Some(session_id.to_string()))
            .with_context(Some(reason))
            .log();
        Ok(true)
    }

    /// Revoke every session of `user_id` except the one holding `except_token`.
    ///
    /// Returns false only when the user has no sessions at all. Failures on
    /// individual sessions are logged and do not change the result.
    pub async fn revoke_all_for_user(
        &self,
        user_id: &str,
        except_token: Option<&str>,
    ) -> Result<bool, SessionError> {
        let sessions = self.sessions.list_sessions_for_user(user_id).await?;
        if sessions.is_empty() {
            return Ok(false);
        }

        // Best effort: one failed write is logged and the rest still run.
        let mut revoked = 0_u64;
        for session in sessions.iter().filter(|s| {
            s.status != SessionStatus::Revoked
                && except_token != Some(s.external_session_token.as_str())
        }) {
            match self
                .sessions
                .update_session_status(
                    session.id,
                    SessionStatus::Revoked,
                    Some(REVOKE_ALL_REASON.to_string()),
                )
                .await
            {
                Ok(_) => revoked += 1,
                Err(e) => {
                    error!(session_id = %session.id, error = %e, "failed to revoke session");
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_sessions_revoked(revoked);
        }
        AuthAuditEvent::new(AuthEventType::SessionsRevokedForUser, AuthEventOutcome::Success)
            .with_user_id(Some(user_id.to_string()))
            .with_context(Some(format!("{revoked} sessions revoked")))
            .log();
        info!(user_id = %user_id, revoked, "revoked user sessions");
        Ok(true)
    }

    /// Operator override flagging a session for review.
    ///
    /// Returns false if the session does not exist or is already revoked.
    pub async fn mark_suspicious(&self, session_id: Uuid) -> Result<bool, SessionError> {
        let Some(session) = self.sessions.get_session(session_id).await? else {
            return Ok(false);
        };
        if !session.status.can_transition_to(SessionStatus::Suspicious) {
            return Ok(false);
        }

        if self
            .sessions
            .update_session_status(session_id, SessionStatus::Suspicious, None)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_session_flagged(None);
        }
        AuthAuditEvent::new(AuthEventType::SessionMarkedSuspicious, AuthEventOutcome::Flagged)
            .with_user_id(Some(session.user_id))
            .with_session_id(Some(session_id.to_string()))
            .log();
        Ok(true)
    }

    pub async fn list_active(&self, user_id: &str) -> Result<Vec<Session>, SessionError> {
        let sessions = self.sessions.list_sessions_for_user(user_id).await?;
        Ok(sessions
            .into_iter()
            .filter(|s| s.status == SessionStatus::Active)
            .collect())
    }

    pub async fn list_suspicious(&self) -> Result<Vec<Session>, SessionError> {
        Ok(self
            .sessions
            .list_sessions_by_status(SessionStatus::Suspicious)
            .await?)
    }

    pub async fn list_all(&self) -> Result<Vec<Session>, SessionError> {
        Ok(self.sessions.list_all_sessions().await?)
    }

    pub async fn get(&self, session_id: Uuid) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.get_session(session_id).await?)
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.sessions.get_session_by_token(token).await?)
    }

    pub async fn locations_for_session(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<LocationObservation>, SessionError> {
        Ok(self.locations.list_locations_for_session(session_id).await?)
    }
}
