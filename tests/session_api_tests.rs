use actix_web::{http::StatusCode, test};
use chrono::{Duration, Utc};
use lms_session_api::{
    AppState, AuthConfig, DetectorConfig, MemoryStore, ObservabilityConfig, RateLimitConfig,
    SessionRepository, SessionStatus, create_app,
    models::{DeviceProfile, NewSession, Session},
};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

fn test_state(store: &MemoryStore) -> AppState {
    AppState::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        DetectorConfig::default(),
        AuthConfig::default()
            .with_user("alice", "alice-pass")
            .with_user("bob", "bob-pass"),
        RateLimitConfig {
            max_attempts: 100,
            period_seconds: 60,
        },
        ObservabilityConfig::default(),
    )
    .expect("metrics registry should build")
}

macro_rules! login {
    ($app:expr, $username:expr, $password:expr, $ip:expr) => {{
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .insert_header(("X-Forwarded-For", $ip))
            .insert_header(("User-Agent", CHROME_WINDOWS))
            .set_json(json!({ "username": $username, "password": $password }))
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "login as {} should succeed", $username);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

fn token_of(login: &Value) -> &str {
    login["token"].as_str().expect("login should return a token")
}

fn session_id_of(login: &Value) -> Uuid {
    login["session_id"].as_str().unwrap().parse().unwrap()
}

#[actix_web::test]
async fn test_login_creates_tracked_session() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;

    let body = login!(&app, "alice", "alice-pass", "198.51.100.4");

    assert_eq!(body["success"], true);
    assert_eq!(body["flagged"], false);
    let token = token_of(&body);
    assert!(token.starts_with("token_"));

    let session = store.get_session_by_token(token).await.unwrap().unwrap();
    assert_eq!(session.id, session_id_of(&body));
    assert_eq!(session.user_id, "alice");
    assert_eq!(session.ip_address.as_deref(), Some("198.51.100.4"));
    assert_eq!(session.device_info.as_deref(), Some(CHROME_WINDOWS));
    assert_eq!(session.browser_name.as_deref(), Some("Chrome"));
    assert!(session.expires_at.is_some());
}

#[actix_web::test]
async fn test_login_rejects_bad_credentials() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "username": "alice", "password": "nope" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Invalid credentials");
    assert!(store.list_all_sessions().await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_flagged_login_still_succeeds() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let mut earlier = Session::from_new(
        NewSession::new("alice", "token_tablet")
            .with_location(Some("Nairobi".to_string()))
            .with_device_info(Some("Tablet/1.0".to_string())),
        DeviceProfile::default(),
        now - Duration::minutes(20),
    );
    earlier.last_activity = now - Duration::minutes(5);
    store.insert_session(earlier).await.unwrap();
    let app = test::init_service(create_app(test_state(&store))).await;

    let body = login!(&app, "alice", "alice-pass", "198.51.100.4");

    assert_eq!(body["success"], true);
    assert_eq!(body["flagged"], true);
    let session = store
        .get_session(session_id_of(&body))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Suspicious);

    // A flagged session still authenticates.
    let req = test::TestRequest::get()
        .uri("/sessions")
        .insert_header(bearer(token_of(&body)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_logout_ends_session() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;
    let body = login!(&app, "alice", "alice-pass", "198.51.100.4");
    let token = token_of(&body);

    let req = test::TestRequest::post()
        .uri("/auth/logout")
        .insert_header(bearer(token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let session = store.get_session_by_token(token).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Inactive);

    // The token no longer authenticates.
    let req = test::TestRequest::get()
        .uri("/sessions")
        .insert_header(bearer(token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn test_session_routes_require_token() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;

    let req = test::TestRequest::get().uri("/sessions").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::get()
        .uri("/sessions")
        .insert_header(bearer("token_forged"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unauthorized");
}

#[actix_web::test]
async fn test_list_my_sessions_marks_current_and_hides_reasons() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;
    let first = login!(&app, "alice", "alice-pass", "198.51.100.4");
    let second = login!(&app, "alice", "alice-pass", "198.51.100.4");
    login!(&app, "bob", "bob-pass", "192.0.2.1");

    let req = test::TestRequest::get()
        .uri("/sessions")
        .insert_header(bearer(token_of(&second)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let sessions: Vec<Value> = test::read_body_json(resp).await;

    assert_eq!(sessions.len(), 2);
    for view in &sessions {
        assert!(view.get("revocation_reason").is_none());
        assert!(view.get("user_id").is_none());
        let is_current = view["id"] == second["session_id"];
        assert_eq!(view["is_current"], is_current);
    }
    assert!(sessions.iter().any(|v| v["id"] == first["session_id"]));
}

#[actix_web::test]
async fn test_requests_record_activity() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;
    let body = login!(&app, "alice", "alice-pass", "198.51.100.4");
    let before = store
        .get_session(session_id_of(&body))
        .await
        .unwrap()
        .unwrap()
        .last_activity;

    let req = test::TestRequest::get()
        .uri("/sessions")
        .insert_header(bearer(token_of(&body)))
        .to_request();
    test::call_service(&app, req).await;

    let after = store
        .get_session(session_id_of(&body))
        .await
        .unwrap()
        .unwrap()
        .last_activity;
    assert!(after >= before);
}

#[actix_web::test]
async fn test_revoke_own_other_session() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;
    let laptop = login!(&app, "alice", "alice-pass", "198.51.100.4");
    let phone = login!(&app, "alice", "alice-pass", "198.51.100.4");

    let req = test::TestRequest::delete()
        .uri(&format!("/sessions/{}", session_id_of(&laptop)))
        .insert_header(bearer(token_of(&phone)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let revoked = store
        .get_session(session_id_of(&laptop))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(revoked.status, SessionStatus::Revoked);

    // The revoked token is rejected from now on.
    let req = test::TestRequest::get()
        .uri("/sessions")
        .insert_header(bearer(token_of(&laptop)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn test_cannot_revoke_current_session() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;
    let body = login!(&app, "alice", "alice-pass", "198.51.100.4");

    let req = test::TestRequest::delete()
        .uri(&format!("/sessions/{}", session_id_of(&body)))
        .insert_header(bearer(token_of(&body)))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let session = store
        .get_session(session_id_of(&body))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Active);
}

#[actix_web::test]
async fn test_cannot_revoke_another_users_session() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;
    let alice = login!(&app, "alice", "alice-pass", "198.51.100.4");
    let bob = login!(&app, "bob", "bob-pass", "192.0.2.1");

    let req = test::TestRequest::delete()
        .uri(&format!("/sessions/{}", session_id_of(&bob)))
        .insert_header(bearer(token_of(&alice)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::delete()
        .uri(&format!("/sessions/{}", Uuid::new_v4()))
        .insert_header(bearer(token_of(&alice)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let req = test::TestRequest::delete()
        .uri("/sessions/not-a-uuid")
        .insert_header(bearer(token_of(&alice)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[actix_web::test]
async fn test_admin_routes_require_admin() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;
    let alice = login!(&app, "alice", "alice-pass", "198.51.100.4");

    for (method, uri) in [
        ("GET", "/admin/sessions".to_string()),
        ("GET", "/admin/sessions/suspicious".to_string()),
        ("GET", format!("/admin/sessions/{}/locations", session_id_of(&alice))),
        ("PUT", format!("/admin/sessions/{}/mark-suspicious", session_id_of(&alice))),
        ("DELETE", format!("/admin/sessions/{}", session_id_of(&alice))),
        ("DELETE", "/admin/users/alice/sessions".to_string()),
    ] {
        let req = match method {
            "GET" => test::TestRequest::get(),
            "PUT" => test::TestRequest::put(),
            _ => test::TestRequest::delete(),
        }
        .uri(&uri)
        .insert_header(bearer(token_of(&alice)))
        .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::FORBIDDEN,
            "{method} {uri} should be admin only"
        );
    }

    let session = store
        .get_session(session_id_of(&alice))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.status, SessionStatus::Active);
}

#[actix_web::test]
async fn test_admin_review_flow() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;
    let admin = login!(&app, "admin", "password123", "10.0.0.1");
    let alice = login!(&app, "alice", "alice-pass", "198.51.100.4");
    let alice_id = session_id_of(&alice);

    // Full listing exposes owners.
    let req = test::TestRequest::get()
        .uri("/admin/sessions")
        .insert_header(bearer(token_of(&admin)))
        .to_request();
    let all: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|v| v["user_id"] == "alice"));

    // Location observations recorded at login.
    let req = test::TestRequest::get()
        .uri(&format!("/admin/sessions/{alice_id}/locations"))
        .insert_header(bearer(token_of(&admin)))
        .to_request();
    let locations: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0]["ip_address"], "198.51.100.4");

    // Manual flag.
    let req = test::TestRequest::put()
        .uri(&format!("/admin/sessions/{alice_id}/mark-suspicious"))
        .insert_header(bearer(token_of(&admin)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/admin/sessions/suspicious")
        .insert_header(bearer(token_of(&admin)))
        .to_request();
    let suspicious: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(suspicious.len(), 1);
    assert_eq!(suspicious[0]["id"], alice_id.to_string());
    assert_eq!(suspicious[0]["status"], "suspicious");

    // Revoke with a reason, twice.
    for _ in 0..2 {
        let req = test::TestRequest::delete()
            .uri(&format!("/admin/sessions/{alice_id}?reason=shared%20account"))
            .insert_header(bearer(token_of(&admin)))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }
    let revoked = store.get_session(alice_id).await.unwrap().unwrap();
    assert_eq!(revoked.status, SessionStatus::Revoked);
    assert_eq!(revoked.revocation_reason.as_deref(), Some("shared account"));

    // Revoked sessions cannot be flagged again.
    let req = test::TestRequest::put()
        .uri(&format!("/admin/sessions/{alice_id}/mark-suspicious"))
        .insert_header(bearer(token_of(&admin)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    // Unknown sessions.
    let req = test::TestRequest::delete()
        .uri(&format!("/admin/sessions/{}", Uuid::new_v4()))
        .insert_header(bearer(token_of(&admin)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_admin_revokes_all_user_sessions() {
    let store = MemoryStore::new();
    let app = test::init_service(create_app(test_state(&store))).await;
    let admin = login!(&app, "admin", "password123", "10.0.0.1");
    let admin_other = login!(&app, "admin", "password123", "10.0.0.1");
    let bob_one = login!(&app, "bob", "bob-pass", "192.0.2.1");
    let bob_two = login!(&app, "bob", "bob-pass", "192.0.2.1");

    let req = test::TestRequest::delete()
        .uri("/admin/users/bob/sessions")
        .insert_header(bearer(token_of(&admin)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    for body in [&bob_one, &bob_two] {
        let session = store.get_session(session_id_of(body)).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Revoked);
    }

    // Targeting themselves keeps the admin's current session.
    let req = test::TestRequest::delete()
        .uri("/admin/users/admin/sessions")
        .insert_header(bearer(token_of(&admin)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    let current = store.get_session(session_id_of(&admin)).await.unwrap().unwrap();
    assert_eq!(current.status, SessionStatus::Active);
    let other = store
        .get_session(session_id_of(&admin_other))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(other.status, SessionStatus::Revoked);

    let req = test::TestRequest::delete()
        .uri("/admin/users/nobody/sessions")
        .insert_header(bearer(token_of(&admin)))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}
