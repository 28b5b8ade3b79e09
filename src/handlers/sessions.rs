//! Self-service session endpoints.

use crate::{
    handlers::{
        context::{app_data, authenticate},
        error::ApiError,
    },
    models::{SessionActionResponse, SessionView},
    services::SessionManager,
};
use actix_web::{Error, HttpRequest, Result, web};
use paperclip::actix::api_v2_operation;
use uuid::Uuid;

pub const SELF_REVOCATION_REASON: &str = "Revoked by user";

pub(crate) fn parse_session_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid session id: {raw}")))
}

/// List the caller's active sessions
#[api_v2_operation(
    summary = "List My Sessions",
    description = "Returns the caller's active sessions. The session used for this request is marked `is_current`.",
    tags("Sessions"),
    responses(
        (status = 200, description = "Active sessions"),
        (status = 401, description = "Missing or invalid session token")
    )
)]
pub async fn list_my_sessions(req: HttpRequest) -> Result<web::Json<Vec<SessionView>>, Error> {
    let manager = app_data::<SessionManager>(&req, "session manager")?;
    let caller = authenticate(&req, manager).await?;

    let sessions = manager
        .list_active(&caller.session.user_id)
        .await
        .map_err(ApiError::from)?;

    Ok(web::Json(
        sessions
            .iter()
            .map(|s| SessionView::from_session(s, &caller.session.id))
            .collect(),
    ))
}

/// Revoke one of the caller's other sessions
#[api_v2_operation(
    summary = "Revoke My Session",
    description = "Revokes one of the caller's sessions. The current session cannot be revoked here; use logout instead.",
    tags("Sessions"),
    responses(
        (status = 200, description = "Session revoked", body = SessionActionResponse),
        (status = 400, description = "Invalid id or current session"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn revoke_my_session(
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<web::Json<SessionActionResponse>, Error> {
    let manager = app_data::<SessionManager>(&req, "session manager")?;
    let caller = authenticate(&req, manager).await?;
    let session_id = parse_session_id(&path)?;

    if session_id == caller.session.id {
        return Err(ApiError::BadRequest(
            "Cannot revoke the current session; log out instead".to_string(),
        )
        .into());
    }

    let target = manager
        .get(session_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    if target.user_id != caller.session.user_id {
        return Err(ApiError::Forbidden("Session belongs to another user".to_string()).into());
    }

    manager
        .revoke(session_id, Some(SELF_REVOCATION_REASON))
        .await
        .map_err(ApiError::from)?;

    Ok(web::Json(SessionActionResponse {
        success: true,
        message: "Session revoked".to_string(),
    }))
}
