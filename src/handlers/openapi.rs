//! OpenAPI specification, shared application state and app factory.

use crate::{
    config::{AuthConfig, DetectorConfig, ObservabilityConfig, RateLimitConfig},
    handlers::{
        get_metrics, health, list_all_sessions, list_my_sessions, list_session_locations,
        list_suspicious_sessions, login, logout, mark_session_suspicious, revoke_my_session,
        revoke_session, revoke_user_sessions, version,
    },
    middleware::{MetricsMiddleware, RequestIdMiddleware},
    services::{AppMetrics, SessionManager, SimpleRateLimiter},
    store::{LocationRepository, MemoryStore, SessionRepository},
};
use actix_web::App;
use paperclip::actix::{OpenApiExt, web};
use paperclip::v2::models::{DefaultApiRaw, Info};
use std::sync::Arc;

/// Creates the OpenAPI specification for the API
pub fn create_openapi_spec() -> DefaultApiRaw {
    DefaultApiRaw {
        info: Info {
            title: "LMS Session API".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description: Some(
                "Session tracking and suspicious-login detection for the LMS.\n\n\
                ## Authentication\n\
                `POST /auth/login` returns an opaque session token. Send it as\n\
                `Authorization: Bearer <token>` on every other session route.\n\
                Expired, revoked and logged-out sessions are rejected with 401.\n\
                \n\
                ## Suspicious logins\n\
                Each login is compared with the user's recent sessions (location\n\
                changes, unfamiliar devices, rapid device changes, too many active\n\
                sessions). Flagged logins still succeed; the response carries\n\
                `flagged: true` and the session appears under\n\
                `GET /admin/sessions/suspicious` for review.\n\
                \n\
                ## Admin routes\n\
                `/admin/*` routes require the caller's user id to be listed in\n\
                `ADMIN_USER_IDS`; other callers receive 403."
                    .into(),
            ),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Everything the handlers need, built once and shared by all workers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub auth: AuthConfig,
    pub observability: ObservabilityConfig,
    pub metrics: AppMetrics,
    pub limiter: SimpleRateLimiter,
}

impl AppState {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        locations: Arc<dyn LocationRepository>,
        detector: DetectorConfig,
        auth: AuthConfig,
        rate_limit: RateLimitConfig,
        observability: ObservabilityConfig,
    ) -> Result<Self, prometheus::Error> {
        let metrics = AppMetrics::new()?;
        let manager =
            SessionManager::new(sessions, locations, detector).with_metrics(metrics.clone());

        Ok(Self {
            sessions: Arc::new(manager),
            auth,
            observability,
            metrics,
            limiter: SimpleRateLimiter::new(rate_limit),
        })
    }

    /// State over the given stores with all configuration read from the environment
    pub fn from_env(
        sessions: Arc<dyn SessionRepository>,
        locations: Arc<dyn LocationRepository>,
    ) -> Result<Self, prometheus::Error> {
        Self::new(
            sessions,
            locations,
            DetectorConfig::from_env(),
            AuthConfig::from_env(),
            RateLimitConfig::from_env(),
            ObservabilityConfig::from_env(),
        )
    }

    /// Environment-configured state backed by a fresh in-memory store
    pub fn in_memory() -> Result<Self, prometheus::Error> {
        let store = MemoryStore::new();
        Self::from_env(Arc::new(store.clone()), Arc::new(store))
    }
}

/// Builds the application with all routes, middleware and shared state.
///
/// Used by the server binary and by integration tests.
pub fn create_app(
    state: AppState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(RequestIdMiddleware)
        .wrap(MetricsMiddleware)
        .wrap_api_with_spec(create_openapi_spec())
        .app_data(web::Data::from(state.sessions))
        .app_data(web::Data::new(state.auth))
        .app_data(web::Data::new(state.observability))
        .app_data(web::Data::new(state.metrics))
        .app_data(web::Data::new(state.limiter))
        .service(web::resource("/api/health").route(web::get().to(health)))
        .service(web::resource("/api/version").route(web::get().to(version)))
        .service(web::resource("/api/metrics").route(web::get().to(get_metrics)))
        .service(web::resource("/auth/login").route(web::post().to(login)))
        .service(web::resource("/auth/logout").route(web::post().to(logout)))
        .service(web::resource("/sessions").route(web::get().to(list_my_sessions)))
        .service(web::resource("/sessions/{id}").route(web::delete().to(revoke_my_session)))
        .service(web::resource("/admin/sessions").route(web::get().to(list_all_sessions)))
        .service(
            web::resource("/admin/sessions/suspicious")
                .route(web::get().to(list_suspicious_sessions)),
        )
        .service(
            web::resource("/admin/sessions/{id}/locations")
                .route(web::get().to(list_session_locations)),
        )
        .service(
            web::resource("/admin/sessions/{id}/mark-suspicious")
                .route(web::put().to(mark_session_suspicious)),
        )
        .service(web::resource("/admin/sessions/{id}").route(web::delete().to(revoke_session)))
        .service(
            web::resource("/admin/users/{user_id}/sessions")
                .route(web::delete().to(revoke_user_sessions)),
        )
        .with_json_spec_at("/api/spec/v2")
        .build()
}

/// App over an in-memory store, configured from the environment
pub fn create_base_app() -> Result<
    App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    >,
    prometheus::Error,
> {
    Ok(create_app(AppState::in_memory()?))
}
