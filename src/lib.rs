//! LMS Session API - session tracking and suspicious-login detection
//!
//! Every login opens a tracked session. Each new session is compared with the
//! user's recent sessions to spot account sharing:
//! - logins from a different location too soon after the last one
//! - logins from an unfamiliar device once the user has several known devices
//! - rapid switching between devices
//! - too many sessions active at once
//!
//! A flagged login still succeeds. The session is marked `suspicious` for an
//! operator to review, and the user's full history is swept for sessions that
//! were in use at the same time from different locations and devices.
//!
//! ## Architecture
//!
//! - `models/` - Sessions, location observations, verdicts and API bodies
//! - `store/` - Repository traits with in-memory and SQLite backends
//! - `services/` - Detector, session lifecycle, device parsing, metrics, rate limiting
//! - `handlers/` - HTTP endpoints and the app factory
//! - `middleware/` - Request IDs and request metrics
//! - `config/` - Environment-driven configuration
//! - `utils/` - Request inspection helpers
//!
//! ## Quick Start
//!
//! ```no_run
//! use lms_session_api::{AppState, create_app};
//! use actix_web::HttpServer;
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let state = AppState::in_memory().map_err(std::io::Error::other)?;
//!     HttpServer::new(move || create_app(state.clone()))
//!         .bind("127.0.0.1:8080")?
//!         .run()
//!         .await
//! }
//! ```

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::{
    AuthConfig, DetectorConfig, ObservabilityConfig, RateLimitConfig, StoreConfig,
};
pub use handlers::{ApiError, AppState, create_app, create_base_app, create_openapi_spec};
pub use middleware::{MetricsMiddleware, RequestId, RequestIdMiddleware};
pub use models::{
    AuthAuditEvent, AuthEventOutcome, AuthEventType, HistoryReport, LocationObservation,
    NewSession, Session, SessionStatus, SuspicionSignal, SuspicionVerdict,
};
pub use services::{
    AppMetrics, DetectionError, LoginSignals, SessionError, SessionManager, SimpleRateLimiter,
    SuspiciousActivityDetector,
};
pub use store::{LocationRepository, MemoryStore, SessionRepository, SqliteStore, StoreError};
