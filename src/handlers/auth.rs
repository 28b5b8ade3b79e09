//! Login and logout endpoints.

use crate::{
    config::AuthConfig,
    handlers::{
        context::{app_data, authenticate},
        error::ApiError,
    },
    middleware::RequestId,
    models::{
        AuthAuditEvent, AuthEventOutcome, AuthEventType, LoginRequest, LoginResponse,
        LogoutResponse, NewSession, SessionStatus,
    },
    services::{SessionManager, SimpleRateLimiter, rate_limit_middleware},
    utils::http::{extract_client_ip, extract_user_agent},
};
use actix_web::{Error, HttpRequest, Result, web};
use chrono::{Duration, Utc};
use paperclip::actix::api_v2_operation;
use uuid::Uuid;

fn audit_event(req: &HttpRequest, event_type: AuthEventType, outcome: AuthEventOutcome) -> AuthAuditEvent {
    AuthAuditEvent::new(event_type, outcome)
        .with_request(
            extract_client_ip(req),
            req.method().to_string(),
            req.uri().path().to_string(),
        )
        .with_user_agent(extract_user_agent(req))
        .with_request_id(RequestId::from_request(req))
}

/// User login endpoint
///
/// Checks credentials, records a new session and runs suspicious-activity
/// detection on it. A flagged login still succeeds; `flagged` tells the
/// client it was marked for review.
#[api_v2_operation(
    summary = "User Login",
    description = "Authenticate a user and open a tracked session",
    tags("Authentication"),
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts")
    )
)]
pub async fn login(
    req: HttpRequest,
    payload: web::Json<LoginRequest>,
) -> Result<web::Json<LoginResponse>, Error> {
    if let Some(limiter) = req.app_data::<web::Data<SimpleRateLimiter>>()
        && rate_limit_middleware(&req, limiter).is_err()
    {
        audit_event(&req, AuthEventType::RateLimitExceeded, AuthEventOutcome::Failure)
            .with_user_id(Some(payload.username.clone()))
            .log();
        return Err(ApiError::TooManyRequests.into());
    }

    let auth = app_data::<AuthConfig>(&req, "authentication")?;
    let manager = app_data::<SessionManager>(&req, "session manager")?;

    if !auth.verify_credentials(&payload.username, &payload.password) {
        audit_event(&req, AuthEventType::LoginFailure, AuthEventOutcome::Failure)
            .with_user_id(Some(payload.username.clone()))
            .log();
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()).into());
    }

    let ip_address = Some(extract_client_ip(&req)).filter(|ip| ip != "unknown");
    let token = format!("token_{}", Uuid::new_v4());
    let new_session = NewSession::new(payload.username.clone(), token.clone())
        .with_device_info(extract_user_agent(&req))
        .with_ip_address(ip_address)
        .with_expires_at(Some(Utc::now() + Duration::minutes(auth.session_ttl_minutes)));

    let session = manager
        .create_session(new_session)
        .await
        .map_err(ApiError::from)?;
    let flagged = session.status == SessionStatus::Suspicious;

    audit_event(&req, AuthEventType::LoginSuccess, AuthEventOutcome::Success)
        .with_user_id(Some(session.user_id.clone()))
        .with_session_id(Some(session.id.to_string()))
        .log();

    Ok(web::Json(LoginResponse {
        success: true,
        token: Some(token),
        session_id: Some(session.id.to_string()),
        flagged,
        message: "Login successful".to_string(),
    }))
}

/// Logout endpoint
///
/// Ends the session identified by the bearer token.
#[api_v2_operation(
    summary = "User Logout",
    description = "End the caller's current session",
    tags("Authentication"),
    responses(
        (status = 200, description = "Session ended", body = LogoutResponse),
        (status = 401, description = "Missing, unknown or ended session token")
    )
)]
pub async fn logout(req: HttpRequest) -> Result<web::Json<LogoutResponse>, Error> {
    let manager = app_data::<SessionManager>(&req, "session manager")?;
    let caller = authenticate(&req, manager).await?;

    if !manager
        .end_session(&caller.token)
        .await
        .map_err(ApiError::from)?
    {
        return Err(ApiError::Unauthorized("Session is not active".to_string()).into());
    }

    Ok(web::Json(LogoutResponse {
        success: true,
        message: "Logged out".to_string(),
    }))
}
