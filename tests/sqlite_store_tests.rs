use chrono::{DateTime, Duration, Utc};
use lms_session_api::{
    DetectorConfig, LocationRepository, SessionManager, SessionRepository, SessionStatus,
    SqliteStore, StoreError, SuspiciousActivityDetector,
    models::{DeviceProfile, GeoLocation, LocationObservation, NewSession, Session},
};
use std::sync::Arc;
use uuid::Uuid;

async fn store() -> SqliteStore {
    SqliteStore::connect("sqlite::memory:")
        .await
        .expect("in-memory database should open")
}

fn session(
    user: &str,
    location: &str,
    device: &str,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
) -> Session {
    let mut session = Session::from_new(
        NewSession::new(user, format!("token_{}", Uuid::new_v4()))
            .with_location(Some(location.to_string()))
            .with_device_info(Some(device.to_string()))
            .with_ip_address(Some("192.0.2.10".to_string()))
            .with_expires_at(Some(created_at + Duration::hours(12))),
        DeviceProfile {
            is_mobile: true,
            browser_name: Some("Safari".to_string()),
            browser_version: Some("17.2".to_string()),
            os_name: Some("iOS".to_string()),
            os_version: Some("17.2".to_string()),
        },
        created_at,
    );
    session.last_activity = last_activity;
    session
}

#[tokio::test]
async fn test_session_round_trip() {
    let store = store().await;
    let now = Utc::now();
    let original = store
        .insert_session(session("alice", "Nairobi", "D1", now, now))
        .await
        .unwrap();

    let loaded = store
        .get_session_by_token(&original.external_session_token)
        .await
        .unwrap()
        .expect("session should be found by token");

    assert_eq!(loaded.id, original.id);
    assert_eq!(loaded.user_id, "alice");
    assert_eq!(loaded.location.as_deref(), Some("Nairobi"));
    assert_eq!(loaded.device_info.as_deref(), Some("D1"));
    assert_eq!(loaded.ip_address.as_deref(), Some("192.0.2.10"));
    assert!(loaded.is_mobile);
    assert_eq!(loaded.browser_name.as_deref(), Some("Safari"));
    assert_eq!(loaded.os_version.as_deref(), Some("17.2"));
    assert_eq!(loaded.status, SessionStatus::Active);
    assert_eq!(
        loaded.created_at.timestamp_micros(),
        original.created_at.timestamp_micros()
    );
    assert_eq!(
        loaded.expires_at.map(|t| t.timestamp_micros()),
        original.expires_at.map(|t| t.timestamp_micros())
    );
    assert_eq!(loaded.revocation_reason, None);

    assert!(store.get_session(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_token_is_rejected() {
    let store = store().await;
    let now = Utc::now();
    let first = store
        .insert_session(session("alice", "Nairobi", "D1", now, now))
        .await
        .unwrap();

    let mut clash = session("bob", "Kigali", "D2", now, now);
    clash.external_session_token = first.external_session_token.clone();

    let result = store.insert_session(clash).await;
    assert!(matches!(result, Err(StoreError::DuplicateToken)));
}

#[tokio::test]
async fn test_sessions_listed_oldest_first() {
    let store = store().await;
    let now = Utc::now();
    let newer = store
        .insert_session(session("alice", "A", "D1", now, now))
        .await
        .unwrap();
    let older = store
        .insert_session(session(
            "alice",
            "B",
            "D1",
            now - Duration::hours(1),
            now - Duration::hours(1),
        ))
        .await
        .unwrap();
    store
        .insert_session(session("bob", "C", "D1", now, now))
        .await
        .unwrap();

    let listed = store.list_sessions_for_user("alice").await.unwrap();
    let ids: Vec<_> = listed.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![older.id, newer.id]);
    assert_eq!(store.list_all_sessions().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_revocation_reason_only_kept_for_revoked() {
    let store = store().await;
    let now = Utc::now();
    let s = store
        .insert_session(session("alice", "A", "D1", now, now))
        .await
        .unwrap();

    let updated = store
        .update_session_status(s.id, SessionStatus::Suspicious, Some("ignored".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, SessionStatus::Suspicious);
    assert_eq!(updated.revocation_reason, None);

    let updated = store
        .update_session_status(s.id, SessionStatus::Revoked, Some("shared account".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, SessionStatus::Revoked);
    assert_eq!(updated.revocation_reason.as_deref(), Some("shared account"));

    let suspicious = store
        .list_sessions_by_status(SessionStatus::Suspicious)
        .await
        .unwrap();
    assert!(suspicious.is_empty());

    let missing = store
        .update_session_status(Uuid::new_v4(), SessionStatus::Revoked, None)
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_revoked_session_cannot_be_reopened() {
    let store = store().await;
    let now = Utc::now();
    let s = store
        .insert_session(session("alice", "A", "D1", now, now))
        .await
        .unwrap();
    store
        .update_session_status(s.id, SessionStatus::Revoked, Some("admin".to_string()))
        .await
        .unwrap();

    for status in [SessionStatus::Active, SessionStatus::Inactive, SessionStatus::Suspicious] {
        let updated = store.update_session_status(s.id, status, None).await.unwrap();
        assert!(updated.is_none(), "{status} should be refused");
    }

    let loaded = store.get_session(s.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, SessionStatus::Revoked);
    assert_eq!(loaded.revocation_reason.as_deref(), Some("admin"));

    let again = store
        .update_session_status(s.id, SessionStatus::Revoked, Some("admin again".to_string()))
        .await
        .unwrap()
        .expect("revoking twice should succeed");
    assert_eq!(again.revocation_reason.as_deref(), Some("admin again"));
}

#[tokio::test]
async fn test_duplicate_observation_is_a_conflict() {
    let store = store().await;
    let now = Utc::now();
    let s = store
        .insert_session(session("alice", "A", "D1", now, now))
        .await
        .unwrap();
    let observation =
        LocationObservation::new("alice", s.id, "192.0.2.10", GeoLocation::default(), now);

    store.insert_location(observation.clone()).await.unwrap();
    let result = store.insert_location(observation).await;
    assert!(matches!(result, Err(StoreError::Conflict(_))), "{result:?}");
}

#[tokio::test]
async fn test_touch_session() {
    let store = store().await;
    let now = Utc::now();
    let s = store
        .insert_session(session("alice", "A", "D1", now, now))
        .await
        .unwrap();
    let later = now + Duration::minutes(15);

    assert!(store.touch_session(&s.external_session_token, later).await.unwrap());
    assert!(!store.touch_session("token_unknown", later).await.unwrap());

    let loaded = store.get_session(s.id).await.unwrap().unwrap();
    assert_eq!(loaded.last_activity.timestamp_micros(), later.timestamp_micros());
}

#[tokio::test]
async fn test_location_requires_existing_session() {
    let store = store().await;
    let orphan = LocationObservation::new(
        "alice",
        Uuid::new_v4(),
        "192.0.2.10",
        GeoLocation::default(),
        Utc::now(),
    );

    let result = store.insert_location(orphan).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_flagging_location_flags_session_atomically() {
    let store = store().await;
    let now = Utc::now();
    let s = store
        .insert_session(session("alice", "A", "D1", now, now))
        .await
        .unwrap();
    let geo = GeoLocation {
        country_code: Some("KE".to_string()),
        country_name: Some("Kenya".to_string()),
        city: Some("Nairobi".to_string()),
        latitude: Some(-1.2921),
        longitude: Some(36.8219),
        ..Default::default()
    };
    let observation = store
        .insert_location(LocationObservation::new("alice", s.id, "192.0.2.10", geo, now))
        .await
        .unwrap();

    assert!(store.mark_location_suspicious(observation.id).await.unwrap());
    assert!(!store.mark_location_suspicious(Uuid::new_v4()).await.unwrap());

    let loaded = store.get_session(s.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, SessionStatus::Suspicious);

    let observations = store.list_locations_for_session(s.id).await.unwrap();
    assert_eq!(observations.len(), 1);
    assert!(observations[0].is_suspicious);
    assert_eq!(observations[0].city.as_deref(), Some("Nairobi"));
    assert_eq!(observations[0].latitude, Some(-1.2921));

    let by_user = store.list_locations_for_user("alice").await.unwrap();
    assert_eq!(by_user.len(), 1);
}

#[tokio::test]
async fn test_flagging_location_keeps_revoked_session_revoked() {
    let store = store().await;
    let now = Utc::now();
    let s = store
        .insert_session(session("alice", "A", "D1", now, now))
        .await
        .unwrap();
    let observation = store
        .insert_location(LocationObservation::new(
            "alice",
            s.id,
            "192.0.2.10",
            GeoLocation::default(),
            now,
        ))
        .await
        .unwrap();
    store
        .update_session_status(s.id, SessionStatus::Revoked, Some("lost device".to_string()))
        .await
        .unwrap();

    store.mark_location_suspicious(observation.id).await.unwrap();

    let loaded = store.get_session(s.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, SessionStatus::Revoked);
    assert_eq!(loaded.revocation_reason.as_deref(), Some("lost device"));
}

#[tokio::test]
async fn test_history_sweep_over_sqlite() {
    let store = store().await;
    let t0 = Utc::now() - Duration::hours(1);
    store
        .insert_session(session(
            "alice",
            "X",
            "D1",
            t0 - Duration::hours(3),
            t0 - Duration::hours(2),
        ))
        .await
        .unwrap();
    let a = store
        .insert_session(session("alice", "X", "D1", t0, t0 + Duration::minutes(20)))
        .await
        .unwrap();
    let b = store
        .insert_session(session(
            "alice",
            "Y",
            "D2",
            t0 + Duration::minutes(10),
            t0 + Duration::minutes(15),
        ))
        .await
        .unwrap();

    let detector = SuspiciousActivityDetector::new(Arc::new(store.clone()), DetectorConfig::default());
    let report = detector.analyze_history("alice").await.unwrap();

    assert_eq!(report.flagged_session_ids.len(), 2);
    for id in [a.id, b.id] {
        let loaded = store.get_session(id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Suspicious);
    }
}

#[tokio::test]
async fn test_lifecycle_over_sqlite() {
    let store = store().await;
    let manager = SessionManager::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        DetectorConfig::default(),
    );

    let first = manager
        .create_session(
            NewSession::new("alice", "token_first")
                .with_ip_address(Some("192.0.2.10".to_string()))
                .with_location(Some("Nairobi".to_string())),
        )
        .await
        .unwrap();
    assert_eq!(first.status, SessionStatus::Active);

    let second = manager
        .create_session(
            NewSession::new("alice", "token_second")
                .with_ip_address(Some("198.51.100.7".to_string()))
                .with_location(Some("Mogadishu".to_string())),
        )
        .await
        .unwrap();
    assert_eq!(second.status, SessionStatus::Suspicious);
    let observations = manager.locations_for_session(second.id).await.unwrap();
    assert!(observations[0].is_suspicious);

    assert!(
        manager
            .revoke_all_for_user("alice", Some("token_second"))
            .await
            .unwrap()
    );
    let first = manager.get(first.id).await.unwrap().unwrap();
    assert_eq!(first.status, SessionStatus::Revoked);
    let second = manager.get(second.id).await.unwrap().unwrap();
    assert_eq!(second.status, SessionStatus::Suspicious);

    store.close().await;
}
