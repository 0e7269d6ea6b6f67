//! Session token module
//!
//! A successful passkey login is exchanged for a short-lived HS256 JWT.
//! `AuthenticatedSession` is the Axum extractor that validates it on later
//! requests.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use passgate_core::Identity;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// `iss` claim of every token this server signs
pub const TOKEN_ISSUER: &str = "passgate";

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user id)
    pub sub: String,
    pub username: String,
    pub role: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// Numeric user id from the `sub` claim
    pub fn user_id(&self) -> Result<i64, ApiError> {
        self.sub
            .parse()
            .map_err(|_| ApiError::auth_error("AUTH_INVALID_TOKEN", "Token subject is not a user id"))
    }
}

/// Token returned to the client after login
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and validates session tokens with one shared secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for an identity that just completed a login ceremony.
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, ApiError> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| ApiError::internal(format!("Invalid token lifetime: {}", e)))?;
        let expires_at = now + ttl;

        let claims = SessionClaims {
            sub: identity.user_id.to_string(),
            username: identity.username.clone(),
            role: identity.role.clone(),
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::internal(format!("Failed to sign session token: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate signature, issuer and expiry of a session token.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_issuer(&[TOKEN_ISSUER]);

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::auth_error("AUTH_TOKEN_EXPIRED", "Session token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    ApiError::auth_error("AUTH_INVALID_TOKEN", "Invalid session token signature")
                }
                _ => ApiError::auth_error(
                    "AUTH_INVALID_TOKEN",
                    format!("Session token validation failed: {}", e),
                ),
            },
        )?;

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Extract the Bearer token from the Authorization header
fn extract_bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| {
            ApiError::auth_error("AUTH_MISSING_TOKEN", "Missing Authorization header")
        })?;

    let auth_value = auth_header.to_str().map_err(|_| {
        ApiError::auth_error(
            "AUTH_INVALID_TOKEN",
            "Invalid Authorization header encoding",
        )
    })?;

    auth_value.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::auth_error(
            "AUTH_INVALID_TOKEN",
            "Authorization header must use Bearer scheme",
        )
    })
}

/// Extractor for requests carrying a valid session token.
///
/// Returns 401 with structured error codes on any failure.
pub struct AuthenticatedSession {
    pub claims: SessionClaims,
}

impl FromRequestParts<AppState> for AuthenticatedSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;
        let claims = state.tokens.verify(token)?;
        Ok(AuthenticatedSession { claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-secret", Duration::from_secs(3600))
    }

    fn alice() -> Identity {
        Identity::new(42, "alice", "Alice Martin", "teacher")
    }

    fn expect_code(err: ApiError, expected: &str) {
        match err {
            ApiError::AuthError { code, .. } => assert_eq!(code, expected),
            other => panic!("Expected AuthError with {}, got: {:?}", expected, other),
        }
    }

    #[test]
    fn test_issued_token_round_trips() {
        let issuer = issuer();
        let issued = issuer.issue(&alice()).unwrap();

        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, "teacher");
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issued = TokenIssuer::new(b"other-secret", Duration::from_secs(60))
            .issue(&alice())
            .unwrap();
        expect_code(issuer().verify(&issued.token).unwrap_err(), "AUTH_INVALID_TOKEN");
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: "42".to_string(),
            username: "alice".to_string(),
            role: "teacher".to_string(),
            iss: TOKEN_ISSUER.to_string(),
            iat: now - 7200,
            // Past the default 60s leeway
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        expect_code(issuer().verify(&token).unwrap_err(), "AUTH_TOKEN_EXPIRED");
    }

    #[test]
    fn test_garbage_token() {
        expect_code(issuer().verify("not.a.jwt").unwrap_err(), "AUTH_INVALID_TOKEN");
    }

    #[test]
    fn test_extract_bearer_token_missing_header() {
        let (parts, _) = axum::http::Request::builder()
            .body(())
            .unwrap()
            .into_parts();

        expect_code(extract_bearer_token(&parts).unwrap_err(), "AUTH_MISSING_TOKEN");
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let (parts, _) = axum::http::Request::builder()
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap()
            .into_parts();

        expect_code(extract_bearer_token(&parts).unwrap_err(), "AUTH_INVALID_TOKEN");
    }

    #[test]
    fn test_extract_bearer_token_success() {
        let (parts, _) = axum::http::Request::builder()
            .header("Authorization", "Bearer my-jwt-token")
            .body(())
            .unwrap()
            .into_parts();

        assert_eq!(extract_bearer_token(&parts).unwrap(), "my-jwt-token");
    }
}
