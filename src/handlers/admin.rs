//! Operator endpoints for reviewing and overriding detector verdicts.
//!
//! Every route requires a session whose user id is listed in `ADMIN_USER_IDS`.

use crate::{
    config::AuthConfig,
    handlers::{
        context::{CallerSession, app_data, authenticate},
        error::ApiError,
        sessions::parse_session_id,
    },
    models::{AdminSessionView, LocationView, RevokeQuery, SessionActionResponse},
    services::SessionManager,
};
use actix_web::{Error, HttpRequest, Result, web};
use paperclip::actix::api_v2_operation;

async fn authorize_admin<'a>(
    req: &'a HttpRequest,
) -> Result<(&'a web::Data<SessionManager>, CallerSession), ApiError> {
    let manager = app_data::<SessionManager>(req, "session manager")?;
    let auth = app_data::<AuthConfig>(req, "authentication")?;
    let caller = authenticate(req, manager).await?;

    if !auth.is_admin(&caller.session.user_id) {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }
    Ok((manager, caller))
}

fn views(sessions: &[crate::models::Session]) -> Vec<AdminSessionView> {
    sessions.iter().map(AdminSessionView::from).collect()
}

#[api_v2_operation(
    summary = "List All Sessions",
    description = "Returns every session, including revocation reasons.",
    tags("Admin"),
    responses(
        (status = 200, description = "All sessions"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_all_sessions(req: HttpRequest) -> Result<web::Json<Vec<AdminSessionView>>, Error> {
    let (manager, _) = authorize_admin(&req).await?;
    let sessions = manager.list_all().await.map_err(ApiError::from)?;
    Ok(web::Json(views(&sessions)))
}

#[api_v2_operation(
    summary = "List Suspicious Sessions",
    description = "Returns sessions flagged by the detector or by an operator.",
    tags("Admin"),
    responses(
        (status = 200, description = "Suspicious sessions"),
        (status = 401, description = "Missing or invalid session token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_suspicious_sessions(
    req: HttpRequest,
) -> Result<web::Json<Vec<AdminSessionView>>, Error> {
    let (manager, _) = authorize_admin(&req).await?;
    let sessions = manager.list_suspicious().await.map_err(ApiError::from)?;
    Ok(web::Json(views(&sessions)))
}

#[api_v2_operation(
    summary = "List Session Locations",
    description = "Returns the IP location observations recorded for a session.",
    tags("Admin"),
    responses(
        (status = 200, description = "Location observations"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn list_session_locations(
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<web::Json<Vec<LocationView>>, Error> {
    let (manager, _) = authorize_admin(&req).await?;
    let session_id = parse_session_id(&path)?;

    if manager.get(session_id).await.map_err(ApiError::from)?.is_none() {
        return Err(ApiError::NotFound("Session not found".to_string()).into());
    }
    let locations = manager
        .locations_for_session(session_id)
        .await
        .map_err(ApiError::from)?;
    Ok(web::Json(locations.iter().map(LocationView::from).collect()))
}

#[api_v2_operation(
    summary = "Mark Session Suspicious",
    description = "Flags a session for review. Revoked sessions cannot be flagged.",
    tags("Admin"),
    responses(
        (status = 200, description = "Session flagged", body = SessionActionResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Session not found or already revoked")
    )
)]
pub async fn mark_session_suspicious(
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<web::Json<SessionActionResponse>, Error> {
    let (manager, _) = authorize_admin(&req).await?;
    let session_id = parse_session_id(&path)?;

    if !manager
        .mark_suspicious(session_id)
        .await
        .map_err(ApiError::from)?
    {
        return Err(ApiError::NotFound("Session not found or already revoked".to_string()).into());
    }

    Ok(web::Json(SessionActionResponse {
        success: true,
        message: "Session marked as suspicious".to_string(),
    }))
}

#[api_v2_operation(
    summary = "Revoke Session",
    description = "Revokes any session. Revoking an already revoked session succeeds.",
    tags("Admin"),
    responses(
        (status = 200, description = "Session revoked", body = SessionActionResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn revoke_session(
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<RevokeQuery>,
) -> Result<web::Json<SessionActionResponse>, Error> {
    let (manager, _) = authorize_admin(&req).await?;
    let session_id = parse_session_id(&path)?;

    if !manager
        .revoke(session_id, query.reason.as_deref())
        .await
        .map_err(ApiError::from)?
    {
        return Err(ApiError::NotFound("Session not found".to_string()).into());
    }

    Ok(web::Json(SessionActionResponse {
        success: true,
        message: "Session revoked".to_string(),
    }))
}

#[api_v2_operation(
    summary = "Revoke User Sessions",
    description = "Revokes all sessions of a user. When admins target themselves, the session making the request is kept.",
    tags("Admin"),
    responses(
        (status = 200, description = "Sessions revoked", body = SessionActionResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User has no sessions")
    )
)]
pub async fn revoke_user_sessions(
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<web::Json<SessionActionResponse>, Error> {
    let (manager, caller) = authorize_admin(&req).await?;
    let user_id = path.into_inner();

    let except_token = (user_id == caller.session.user_id).then_some(caller.token.as_str());
    if !manager
        .revoke_all_for_user(&user_id, except_token)
        .await
        .map_err(ApiError::from)?
    {
        return Err(ApiError::NotFound("User has no sessions".to_string()).into());
    }

    Ok(web::Json(SessionActionResponse {
        success: true,
        message: format!("Sessions revoked for user {user_id}"),
    }))
}
