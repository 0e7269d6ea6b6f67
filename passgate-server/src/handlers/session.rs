//! Session introspection handler

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthenticatedSession;
use crate::error::ApiError;

/// Identity carried by a valid session token
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    /// Token expiry (Unix seconds)
    pub expires_at: i64,
}

/// GET /api/auth/session
///
/// Validate the bearer token issued by `finish-login` and echo its identity.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    tag = "Session",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Token is valid", body = SessionResponse),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
pub async fn current_session(
    session: AuthenticatedSession,
) -> Result<Json<SessionResponse>, ApiError> {
    let claims = session.claims;
    Ok(Json(SessionResponse {
        user_id: claims.user_id()?,
        username: claims.username,
        role: claims.role,
        expires_at: claims.exp,
    }))
}
