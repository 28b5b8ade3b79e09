//! In-memory storage backend.

use super::{LocationRepository, SessionRepository, StoreError, StoreResult};
use crate::models::{LocationObservation, Session, SessionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    sessions: HashMap<Uuid, Session>,
    token_index: HashMap<String, Uuid>,
    locations: HashMap<Uuid, LocationObservation>,
}

/// Session and location tables behind a single lock.
///
/// Holding one lock for both tables makes the cascading suspicious flag atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn sorted_by_creation(mut sessions: Vec<Session>) -> Vec<Session> {
    sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    sessions
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn insert_session(&self, session: Session) -> StoreResult<Session> {
        let mut tables = self.lock()?;
        if tables.token_index.contains_key(&session.external_session_token) {
            return Err(StoreError::DuplicateToken);
        }
        tables
            .token_index
            .insert(session.external_session_token.clone(), session.id);
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<Session>> {
        Ok(self.lock()?.sessions.get(&id).cloned())
    }

    async fn get_session_by_token(&self, token: &str) -> StoreResult<Option<Session>> {
        let tables = self.lock()?;
        Ok(tables
            .token_index
            .get(token)
            .and_then(|id| tables.sessions.get(id))
            .cloned())
    }

    async fn list_sessions_for_user(&self, user_id: &str) -> StoreResult<Vec<Session>> {
        let tables = self.lock()?;
        Ok(sorted_by_creation(
            tables
                .sessions
                .values()
                .filter(|s| s.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_sessions_by_status(&self, status: SessionStatus) -> StoreResult<Vec<Session>> {
        let tables = self.lock()?;
        Ok(sorted_by_creation(
            tables
                .sessions
                .values()
                .filter(|s| s.status == status)
                .cloned()
                .collect(),
        ))
    }

    async fn list_all_sessions(&self) -> StoreResult<Vec<Session>> {
        let tables = self.lock()?;
        Ok(sorted_by_creation(tables.sessions.values().cloned().collect()))
    }

    async fn update_session_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        revocation_reason: Option<String>,
    ) -> StoreResult<Option<Session>> {
        let mut tables = self.lock()?;
        let Some(session) = tables.sessions.get_mut(&id) else {
            return Ok(None);
        };
        // Revoked is terminal; checked under the same lock as the write.
        if !session.status.can_transition_to(status) {
            return Ok(None);
        }
        session.status = status;
        session.revocation_reason = if status == SessionStatus::Revoked {
            revocation_reason
        } else {
            None
        };
        Ok(Some(session.clone()))
    }

    async fn touch_session(&self, token: &str, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        let Some(id) = tables.token_index.get(token).copied() else {
            return Ok(false);
        };
        match tables.sessions.get_mut(&id) {
            Some(session) => {
                session.last_activity = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl LocationRepository for MemoryStore {
    async fn insert_location(
        &self,
        observation: LocationObservation,
    ) -> StoreResult<LocationObservation> {
        let mut tables = self.lock()?;
        if !tables.sessions.contains_key(&observation.session_id) {
            return Err(StoreError::NotFound(format!(
                "session {}",
                observation.session_id
            )));
        }
        tables.locations.insert(observation.id, observation.clone());
        Ok(observation)
    }

    async fn list_locations_for_session(
        &self,
        session_id: Uuid,
    ) -> StoreResult<Vec<LocationObservation>> {
        let tables = self.lock()?;
        let mut observations: Vec<_> = tables
            .locations
            .values()
            .filter(|o| o.session_id == session_id)
            .cloned()
            .collect();
        observations.sort_by_key(|o| o.created_at);
        Ok(observations)
    }

    async fn list_locations_for_user(&self, user_id: &str) -> StoreResult<Vec<LocationObservation>> {
        let tables = self.lock()?;
        let mut observations: Vec<_> = tables
            .locations
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        observations.sort_by_key(|o| o.created_at);
        Ok(observations)
    }

    async fn mark_location_suspicious(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.lock()?;
        let Some(observation) = tables.locations.get_mut(&id) else {
            return Ok(false);
        };
        observation.is_suspicious = true;
        let session_id = observation.session_id;

        if let Some(session) = tables.sessions.get_mut(&session_id)
            && session.status.can_transition_to(SessionStatus::Suspicious)
        {
            session.status = SessionStatus::Suspicious;
            session.revocation_reason = None;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeviceProfile, GeoLocation, NewSession};

    fn session(user: &str, token: &str) -> Session {
        Session::from_new(NewSession::new(user, token), DeviceProfile::default(), Utc::now())
    }

    #[actix_web::test]
    async fn test_duplicate_token_rejected() {
        let store = MemoryStore::new();
        store.insert_session(session("u1", "tok")).await.unwrap();
        let err = store.insert_session(session("u2", "tok")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateToken));
    }

    #[actix_web::test]
    async fn test_location_requires_owning_session() {
        let store = MemoryStore::new();
        let orphan = LocationObservation::new(
            "u1",
            Uuid::new_v4(),
            "10.0.0.1",
            GeoLocation::default(),
            Utc::now(),
        );
        let err = store.insert_location(orphan).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[actix_web::test]
    async fn test_revocation_reason_only_when_revoked() {
        let store = MemoryStore::new();
        let s = store.insert_session(session("u1", "tok")).await.unwrap();

        let updated = store
            .update_session_status(s.id, SessionStatus::Suspicious, Some("ignored".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.revocation_reason, None);

        let revoked = store
            .update_session_status(s.id, SessionStatus::Revoked, Some("gone".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(revoked.revocation_reason, Some("gone".to_string()));

        assert!(
            store
                .update_session_status(Uuid::new_v4(), SessionStatus::Revoked, None)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[actix_web::test]
    async fn test_touch_unknown_token() {
        let store = MemoryStore::new();
        assert!(!store.touch_session("missing", Utc::now()).await.unwrap());
    }
}
