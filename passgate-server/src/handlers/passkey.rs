//! Passkey ceremony endpoint handlers
//!
//! Thin HTTP wrappers around the registration and login ceremonies. Each
//! request names the user; the identity is resolved from the directory before
//! the ceremony runs.

use axum::{extract::State, Json};
use passgate_core::{CreationChallengeResponse, RequestChallengeResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::validate_username;

/// Request naming the user a ceremony is for
#[derive(Debug, Deserialize, ToSchema)]
pub struct UsernameRequest {
    /// Login name as known to the user directory
    #[schema(example = "alice")]
    pub username: String,
}

/// Authenticator response posted back by the browser
#[derive(Debug, Deserialize, ToSchema)]
pub struct FinishCeremonyRequest {
    #[schema(example = "alice")]
    pub username: String,
    /// `PublicKeyCredential` JSON, or just its inner `response` object
    #[schema(value_type = Object)]
    pub response: serde_json::Value,
}

/// Result of a completed registration
#[derive(Debug, Serialize, ToSchema)]
pub struct FinishRegisterResponse {
    pub success: bool,
    /// Base64url id of the stored credential
    pub credential_id: String,
}

/// User summary returned after login
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginUser {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: String,
}

/// Result of a completed login
#[derive(Debug, Serialize, ToSchema)]
pub struct FinishLoginResponse {
    pub success: bool,
    /// HS256 session token for the `Authorization: Bearer` header
    pub token: String,
    /// Token expiry (RFC 3339)
    pub expires_at: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HasPasskeyResponse {
    pub has_passkey: bool,
}

/// POST /api/passkey/begin-register
///
/// Start registration of a new passkey for an existing user.
/// Returns WebAuthn creation options; the challenge is valid for the
/// configured session TTL.
#[utoipa::path(
    post,
    path = "/api/passkey/begin-register",
    tag = "Passkey",
    request_body = UsernameRequest,
    responses(
        (status = 200, description = "Creation options (JSON with publicKey)"),
        (status = 400, description = "Invalid username"),
        (status = 404, description = "User not found"),
        (status = 503, description = "Credential storage unavailable")
    )
)]
pub async fn begin_register(
    State(state): State<AppState>,
    Json(req): Json<UsernameRequest>,
) -> Result<Json<CreationChallengeResponse>, ApiError> {
    let username = validate_username(&req.username)?;
    let identity = state.identity(username).await?;

    let options = state.ceremonies.registration().begin(&identity).await?;
    Ok(Json(options))
}

/// POST /api/passkey/finish-register
///
/// Complete registration with the authenticator's attestation.
///
/// The pending challenge is spent by this call even when the posted
/// response does not parse.
#[utoipa::path(
    post,
    path = "/api/passkey/finish-register",
    tag = "Passkey",
    request_body = FinishCeremonyRequest,
    responses(
        (status = 200, description = "Passkey registered", body = FinishRegisterResponse),
        (status = 400, description = "Malformed response or ceremony expired"),
        (status = 401, description = "Ceremony failed"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Credential already registered"),
        (status = 503, description = "Credential storage unavailable")
    )
)]
pub async fn finish_register(
    State(state): State<AppState>,
    Json(req): Json<FinishCeremonyRequest>,
) -> Result<Json<FinishRegisterResponse>, ApiError> {
    let username = validate_username(&req.username)?;
    let identity = state.identity(username).await?;

    let registered = state
        .ceremonies
        .registration()
        .finish(&identity, &req.response)
        .await?;

    // The credential is stored; a stale flag must not fail the registration
    if let Err(e) = state.directory.mark_passkey_verified(identity.user_id).await {
        tracing::warn!(
            user_id = identity.user_id,
            error = %e,
            "Failed to mark passkey as verified"
        );
    }

    Ok(Json(FinishRegisterResponse {
        success: true,
        credential_id: registered.credential_id.to_base64url(),
    }))
}

/// POST /api/passkey/begin-login
///
/// Start a passkey login. Returns WebAuthn request options whose allow-list
/// holds the user's registered credentials.
#[utoipa::path(
    post,
    path = "/api/passkey/begin-login",
    tag = "Passkey",
    request_body = UsernameRequest,
    responses(
        (status = 200, description = "Request options (JSON with publicKey)"),
        (status = 400, description = "Invalid username or no passkey registered"),
        (status = 404, description = "User not found"),
        (status = 503, description = "Credential storage unavailable")
    )
)]
pub async fn begin_login(
    State(state): State<AppState>,
    Json(req): Json<UsernameRequest>,
) -> Result<Json<RequestChallengeResponse>, ApiError> {
    let username = validate_username(&req.username)?;
    let identity = state.identity(username).await?;

    let options = state.ceremonies.authentication().begin(&identity).await?;
    Ok(Json(options))
}

/// POST /api/passkey/finish-login
///
/// Verify the assertion and issue a session token.
///
/// Every verification failure, a replayed sign counter included, is the same
/// `401 CEREMONY_FAILED` to the client.
#[utoipa::path(
    post,
    path = "/api/passkey/finish-login",
    tag = "Passkey",
    request_body = FinishCeremonyRequest,
    responses(
        (status = 200, description = "Logged in", body = FinishLoginResponse),
        (status = 400, description = "Malformed response or ceremony expired"),
        (status = 401, description = "Ceremony failed"),
        (status = 404, description = "User not found"),
        (status = 503, description = "Credential storage unavailable")
    )
)]
pub async fn finish_login(
    State(state): State<AppState>,
    Json(req): Json<FinishCeremonyRequest>,
) -> Result<Json<FinishLoginResponse>, ApiError> {
    let username = validate_username(&req.username)?;
    let identity = state.identity(username).await?;

    let authenticated = state
        .ceremonies
        .authentication()
        .finish(&identity, &req.response)
        .await?;

    let issued = state.tokens.issue(&identity)?;

    tracing::info!(
        user_id = identity.user_id,
        credential_id = %authenticated.credential_id,
        "Session token issued"
    );

    Ok(Json(FinishLoginResponse {
        success: true,
        token: issued.token,
        expires_at: issued.expires_at.to_rfc3339(),
        user: LoginUser {
            id: identity.user_id,
            username: identity.username,
            display_name: identity.display_name,
            role: identity.role,
        },
    }))
}

/// POST /api/passkey/has-passkey
///
/// Whether the user has at least one registered passkey. Unknown usernames
/// answer `false`.
#[utoipa::path(
    post,
    path = "/api/passkey/has-passkey",
    tag = "Passkey",
    request_body = UsernameRequest,
    responses(
        (status = 200, description = "Lookup result", body = HasPasskeyResponse),
        (status = 400, description = "Invalid username"),
        (status = 503, description = "Credential storage unavailable")
    )
)]
pub async fn has_passkey(
    State(state): State<AppState>,
    Json(req): Json<UsernameRequest>,
) -> Result<Json<HasPasskeyResponse>, ApiError> {
    let username = validate_username(&req.username)?;
    let identity = state
        .directory
        .find_by_username(username)
        .await
        .map_err(passgate_core::CeremonyError::from)?;

    let has_passkey = match identity {
        Some(identity) => state.ceremonies.has_passkey(&identity).await?,
        None => false,
    };

    Ok(Json(HasPasskeyResponse { has_passkey }))
}
