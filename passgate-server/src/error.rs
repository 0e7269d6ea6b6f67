//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use passgate_core::CeremonyError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Authentication error with specific error code
    #[error("{message}")]
    AuthError { message: String, code: String },

    /// Passkey ceremony error from the core library
    #[error("Ceremony error: {0}")]
    Ceremony(#[from] CeremonyError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an authentication error with a specific error code
    pub fn auth_error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
            code: code.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthError { .. } => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Ceremony(ref e) => match e {
                CeremonyError::IdentityNotFound(_) => StatusCode::NOT_FOUND,
                CeremonyError::NoCredentialsRegistered(_)
                | CeremonyError::SessionNotFound(_)
                | CeremonyError::SessionExpired(_)
                | CeremonyError::MalformedResponse(_) => StatusCode::BAD_REQUEST,
                CeremonyError::DuplicateCredential(_) => StatusCode::CONFLICT,
                CeremonyError::StorageError(_) => StatusCode::SERVICE_UNAVAILABLE,
                CeremonyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                // Protocol failures
                _ => StatusCode::UNAUTHORIZED,
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::AuthError { code, .. } => code.as_str(),
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Ceremony(ref e) => match e {
                CeremonyError::IdentityNotFound(_) => "IDENTITY_NOT_FOUND",
                CeremonyError::NoCredentialsRegistered(_) => "NO_CREDENTIALS",
                CeremonyError::SessionNotFound(_) | CeremonyError::SessionExpired(_) => {
                    "SESSION_EXPIRED"
                }
                CeremonyError::MalformedResponse(_) => "INVALID_INPUT",
                CeremonyError::DuplicateCredential(_) => "CREDENTIAL_EXISTS",
                CeremonyError::StorageError(_) => "STORAGE_UNAVAILABLE",
                CeremonyError::Internal(_) => "INTERNAL_ERROR",
                _ => "CEREMONY_FAILED",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // Ceremony failures never reveal which check failed
            Self::Ceremony(ref e) => match e {
                CeremonyError::IdentityNotFound(_) => "User not found".to_string(),
                CeremonyError::NoCredentialsRegistered(_) => {
                    "No passkey registered for this user".to_string()
                }
                CeremonyError::SessionNotFound(_) | CeremonyError::SessionExpired(_) => {
                    "Ceremony expired or not started, please start again".to_string()
                }
                CeremonyError::MalformedResponse(_) => {
                    "Malformed authenticator response".to_string()
                }
                CeremonyError::DuplicateCredential(_) => {
                    "This passkey is already registered".to_string()
                }
                CeremonyError::StorageError(_) => {
                    "Credential storage unavailable, please try again".to_string()
                }
                CeremonyError::Internal(_) => "Internal server error".to_string(),
                _ => "Could not complete the passkey ceremony".to_string(),
            },
            Self::Internal(_) => "Internal server error".to_string(),
            // For other errors, use the Display message
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::AuthError { .. } => "auth_error",
            Self::Internal(_) => "internal",
            Self::Ceremony(_) => "ceremony",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code().to_string();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        match &self {
            Self::BadRequest(_) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = %code,
                    error = %internal_message,
                    "Client error"
                );
            }
            Self::AuthError { .. } => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = %code,
                    error = %internal_message,
                    "Authentication error"
                );
            }
            Self::Internal(_) => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = %code,
                    error = %internal_message,
                    "Server error"
                );
            }
            Self::Ceremony(e) if status.is_server_error() => {
                tracing::error!(
                    status = %status,
                    category = category,
                    code = %code,
                    retryable = e.is_retryable(),
                    error = %internal_message,
                    "Ceremony error (internal details logged)"
                );
            }
            Self::Ceremony(e) => {
                tracing::warn!(
                    status = %status,
                    category = category,
                    code = %code,
                    protocol_failure = e.is_protocol_failure(),
                    error = %internal_message,
                    "Ceremony rejected"
                );
            }
        }

        // All error responses include a `code` field for programmatic error handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
