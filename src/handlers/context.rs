//! Shared lookups for handlers: app data and the caller's session.

use crate::{
    handlers::error::ApiError,
    models::Session,
    services::SessionManager,
    utils::extract_bearer_token,
};
use actix_web::{HttpRequest, web};
use chrono::Utc;
use tracing::warn;

/// Registered app data of type `T`
pub(crate) fn app_data<'a, T: 'static>(
    req: &'a HttpRequest,
    name: &'static str,
) -> Result<&'a web::Data<T>, ApiError> {
    req.app_data::<web::Data<T>>()
        .ok_or(ApiError::Unavailable(name))
}

/// Session behind the request's bearer token
pub(crate) struct CallerSession {
    pub token: String,
    pub session: Session,
}

/// Resolve the bearer token to a live, unexpired session and record activity on it.
pub(crate) async fn authenticate(
    req: &HttpRequest,
    manager: &SessionManager,
) -> Result<CallerSession, ApiError> {
    let token = extract_bearer_token(req)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let session = manager
        .get_by_token(&token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid session token".to_string()))?;

    if !session.is_live() || session.is_expired_at(Utc::now()) {
        return Err(ApiError::Unauthorized(
            "Session is no longer valid".to_string(),
        ));
    }

    if let Err(e) = manager.touch_activity(&token).await {
        warn!(session_id = %session.id, error = %e, "failed to record session activity");
    }

    Ok(CallerSession { token, session })
}
