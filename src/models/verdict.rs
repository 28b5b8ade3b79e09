//! Detector outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Heuristic that caused a login to be flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspicionSignal {
    ImpossibleTravel,
    UnusualDevice,
    DeviceChurn,
    TooManyActiveSessions,
}

impl SuspicionSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImpossibleTravel => "impossible_travel",
            Self::UnusualDevice => "unusual_device",
            Self::DeviceChurn => "device_churn",
            Self::TooManyActiveSessions => "too_many_active_sessions",
        }
    }
}

impl fmt::Display for SuspicionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating a single login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspicionVerdict {
    pub is_suspicious: bool,
    pub reason: Option<String>,
    pub signal: Option<SuspicionSignal>,
}

impl SuspicionVerdict {
    pub fn clear() -> Self {
        Self {
            is_suspicious: false,
            reason: None,
            signal: None,
        }
    }

    pub fn flagged(signal: SuspicionSignal, reason: impl Into<String>) -> Self {
        Self {
            is_suspicious: true,
            reason: Some(reason.into()),
            signal: Some(signal),
        }
    }
}

/// Summary of one correlation sweep over a user's session history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryReport {
    pub user_id: String,
    /// Too few sessions to correlate
    pub skipped: bool,
    pub location_cap_exceeded: bool,
    pub overlapping_pairs: usize,
    /// Sessions moved to `suspicious` by this sweep
    pub flagged_session_ids: Vec<Uuid>,
}

impl HistoryReport {
    pub fn skipped(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            skipped: true,
            ..Default::default()
        }
    }
}
