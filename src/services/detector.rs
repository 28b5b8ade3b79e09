//! Suspicious-session detection.
//!
//! Two entry points:
//!
//! * [`SuspiciousActivityDetector::evaluate`] classifies one login against the
//!   user's recent sessions. Checks run in a fixed order and the first match
//!   wins, so a verdict carries exactly one reason:
//!   1. impossible travel (different location, too soon)
//!   2. unusual device (new device once the user has enough known devices)
//!   3. device churn (different device than the most recent session, too soon)
//!   4. too many concurrently active sessions
//! * [`SuspiciousActivityDetector::analyze_history`] sweeps the whole history
//!   and flags sessions that were in use at the same time from different
//!   locations and devices.
//!
//! Both return storage failures as [`DetectionError`]; deciding to fail open
//! is left to the caller.

use crate::{
    config::DetectorConfig,
    models::{HistoryReport, Session, SessionStatus, SuspicionSignal, SuspicionVerdict},
    store::{SessionRepository, StoreError},
};
use chrono::{DateTime, Duration, Utc};
use std::{collections::HashSet, sync::Arc};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("session history unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Signals extracted from a login that has just been recorded
#[derive(Debug, Clone, Copy)]
pub struct LoginSignals<'a> {
    pub user_id: &'a str,
    pub token: &'a str,
    pub location: Option<&'a str>,
    pub device_info: Option<&'a str>,
}

impl<'a> LoginSignals<'a> {
    pub fn from_session(session: &'a Session) -> Self {
        Self {
            user_id: &session.user_id,
            token: &session.external_session_token,
            location: session.location.as_deref(),
            device_info: session.device_info.as_deref(),
        }
    }
}

pub struct SuspiciousActivityDetector {
    sessions: Arc<dyn SessionRepository>,
    config: DetectorConfig,
}

impl SuspiciousActivityDetector {
    pub fn new(sessions: Arc<dyn SessionRepository>, config: DetectorConfig) -> Self {
        Self { sessions, config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub async fn evaluate(
        &self,
        signals: LoginSignals<'_>,
    ) -> Result<SuspicionVerdict, DetectionError> {
        self.evaluate_at(signals, Utc::now()).await
    }

    /// Evaluate a login as of `now`
    pub async fn evaluate_at(
        &self,
        signals: LoginSignals<'_>,
        now: DateTime<Utc>,
    ) -> Result<SuspicionVerdict, DetectionError> {
        let history = self.sessions.list_sessions_for_user(signals.user_id).await?;

        // First login ever: nothing to compare against.
        if history.len() <= 1 {
            return Ok(SuspicionVerdict::clear());
        }

        let cutoff = now - Duration::hours(self.config.lookback_hours);
        let mut recent: Vec<&Session> = history
            .iter()
            .filter(|s| s.external_session_token != signals.token && s.created_at >= cutoff)
            .collect();
        recent.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));

        let verdict = self
            .check_impossible_travel(&signals, &recent, now)
            .or_else(|| self.check_unusual_device(&signals, &history))
            .or_else(|| self.check_device_churn(&signals, &recent, now))
            .or_else(|| self.check_active_sessions(&signals, &history))
            .unwrap_or_else(SuspicionVerdict::clear);

        debug!(
            user_id = %signals.user_id,
            compared = recent.len(),
            suspicious = verdict.is_suspicious,
            "login evaluated"
        );
        Ok(verdict)
    }

    fn check_impossible_travel(
        &self,
        signals: &LoginSignals<'_>,
        recent: &[&Session],
        now: DateTime<Utc>,
    ) -> Option<SuspicionVerdict> {
        let current = signals.location?;
        let previous = recent.iter().find(|s| {
            s.location
                .as_deref()
                .is_some_and(|location| location != current)
        })?;

        let elapsed = now - previous.last_activity;
        if elapsed >= Duration::minutes(self.config.travel_window_minutes) {
            return None;
        }

        let previous_location = previous.location.as_deref().unwrap_or_default();
        Some(SuspicionVerdict::flagged(
            SuspicionSignal::ImpossibleTravel,
            format!(
                "Rapid login from different location ({previous_location} → {current}) within {} minutes",
                elapsed.num_minutes().max(0)
            ),
        ))
    }

    fn check_unusual_device(
        &self,
        signals: &LoginSignals<'_>,
        history: &[Session],
    ) -> Option<SuspicionVerdict> {
        let current = signals.device_info?;
        let known: HashSet<&str> = history
            .iter()
            .filter(|s| s.external_session_token != signals.token)
            .filter_map(|s| s.device_info.as_deref())
            .collect();

        if known.contains(current) || known.len() < self.config.known_device_threshold {
            return None;
        }

        Some(SuspicionVerdict::flagged(
            SuspicionSignal::UnusualDevice,
            format!("Login from unusual device: {current}"),
        ))
    }

    fn check_device_churn(
        &self,
        signals: &LoginSignals<'_>,
        recent: &[&Session],
        now: DateTime<Utc>,
    ) -> Option<SuspicionVerdict> {
        if !self.config.device_churn_enabled {
            return None;
        }
        let current = signals.device_info?;
        let latest = recent.first()?;
        let previous = latest.device_info.as_deref()?;
        if previous == current {
            return None;
        }

        let elapsed = now - latest.last_activity;
        if elapsed >= Duration::minutes(self.config.device_churn_minutes) {
            return None;
        }

        Some(SuspicionVerdict::flagged(
            SuspicionSignal::DeviceChurn,
            format!(
                "Rapid device change ({previous} → {current}) within {} minutes",
                elapsed.num_minutes().max(0)
            ),
        ))
    }

    fn check_active_sessions(
        &self,
        signals: &LoginSignals<'_>,
        history: &[Session],
    ) -> Option<SuspicionVerdict> {
        let active = history
            .iter()
            .filter(|s| {
                s.status == SessionStatus::Active && s.external_session_token != signals.token
            })
            .count();

        if active <= self.config.max_active_sessions {
            return None;
        }

        Some(SuspicionVerdict::flagged(
            SuspicionSignal::TooManyActiveSessions,
            format!("Too many concurrent active sessions ({active})"),
        ))
    }

    /// Correlate all of a user's sessions and flag account-sharing patterns.
    ///
    /// Compares every pair of sessions, so cost grows quadratically with the
    /// number of retained sessions per user.
    pub async fn analyze_history(&self, user_id: &str) -> Result<HistoryReport, DetectionError> {
        let history = self.sessions.list_sessions_for_user(user_id).await?;
        if history.len() < self.config.sweep_min_sessions {
            return Ok(HistoryReport::skipped(user_id));
        }

        let mut report = HistoryReport {
            user_id: user_id.to_string(),
            ..Default::default()
        };
        let mut to_flag: Vec<Uuid> = Vec::new();

        let distinct_locations: HashSet<&str> =
            history.iter().filter_map(|s| s.location.as_deref()).collect();
        if distinct_locations.len() > self.config.max_distinct_locations {
            report.location_cap_exceeded = true;
            to_flag.extend(
                history
                    .iter()
                    .filter(|s| s.status == SessionStatus::Active)
                    .map(|s| s.id),
            );
        }

        let untouched = Duration::minutes(self.config.default_session_window_minutes);
        for (i, a) in history.iter().enumerate() {
            for b in &history[i + 1..] {
                if is_concurrent_sharing(a, b, untouched) {
                    report.overlapping_pairs += 1;
                    to_flag.push(a.id);
                    to_flag.push(b.id);
                }
            }
        }

        let mut seen = HashSet::new();
        for session in &history {
            if !to_flag.contains(&session.id) || !seen.insert(session.id) {
                continue;
            }
            if session.status == SessionStatus::Suspicious
                || !session.status.can_transition_to(SessionStatus::Suspicious)
            {
                continue;
            }
            // None means it was revoked after the history was read.
            if self
                .sessions
                .update_session_status(session.id, SessionStatus::Suspicious, None)
                .await?
                .is_some()
            {
                report.flagged_session_ids.push(session.id);
            }
        }

        if !report.flagged_session_ids.is_empty() {
            info!(
                user_id = %user_id,
                flagged = report.flagged_session_ids.len(),
                overlapping_pairs = report.overlapping_pairs,
                location_cap_exceeded = report.location_cap_exceeded,
                "session history sweep flagged sessions"
            );
        }
        Ok(report)
    }
}

/// Two sessions used at the same time from different locations and devices.
///
/// Sessions without a recorded location or device carry no evidence either way.
fn is_concurrent_sharing(a: &Session, b: &Session, untouched: Duration) -> bool {
    let differs = |x: &Option<String>, y: &Option<String>| match (x, y) {
        (Some(x), Some(y)) => x != y,
        _ => false,
    };
    if !differs(&a.location, &b.location) || !differs(&a.device_info, &b.device_info) {
        return false;
    }

    let (a_start, a_end) = a.activity_window(untouched);
    let (b_start, b_end) = b.activity_window(untouched);
    a_start <= b_end && b_start <= a_end
}
