use thiserror::Error;

use crate::credential::CredentialId;
use crate::response::ResponseError;
use crate::store::{CeremonyKind, RegistryError};
use crate::verifier::VerifyError;

/// Every way a passkey ceremony can fail.
///
/// The variants split into three groups that callers treat differently:
/// client-correctable input problems, protocol/cryptographic failures (which
/// never mutate the registry and must be indistinguishable to a remote client),
/// and retryable server-side failures.
#[derive(Error, Debug)]
pub enum CeremonyError {
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    #[error("No credentials registered for {0}")]
    NoCredentialsRegistered(String),

    #[error("No pending {0} session")]
    SessionNotFound(CeremonyKind),

    #[error("Pending {0} session expired")]
    SessionExpired(CeremonyKind),

    #[error("Challenge mismatch")]
    ChallengeMismatch,

    #[error("Origin not accepted: {0}")]
    OriginMismatch(String),

    #[error("Client data type does not match the ceremony")]
    CeremonyTypeMismatch,

    #[error("Relying party id hash mismatch")]
    RpIdMismatch,

    #[error("User presence flag not set")]
    UserNotPresent,

    #[error("User verification required but not performed")]
    UserNotVerified,

    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Credential already registered: {0}")]
    DuplicateCredential(CredentialId),

    #[error("Credential not found: {0}")]
    CredentialNotFound(CredentialId),

    #[error("Credential {0} does not belong to the requesting identity")]
    CredentialMismatch(CredentialId),

    #[error("Sign counter regression: stored={stored}, reported={reported}")]
    CounterRegression { stored: u64, reported: u64 },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CeremonyError {
    /// Cryptographic or protocol validation failure.
    ///
    /// These are reported to remote clients as one generic failure so that a
    /// counter regression cannot be told apart from a bad signature.
    pub fn is_protocol_failure(&self) -> bool {
        matches!(
            self,
            Self::ChallengeMismatch
                | Self::OriginMismatch(_)
                | Self::CeremonyTypeMismatch
                | Self::RpIdMismatch
                | Self::UserNotPresent
                | Self::UserNotVerified
                | Self::SignatureInvalid(_)
                | Self::CredentialNotFound(_)
                | Self::CredentialMismatch(_)
                | Self::CounterRegression { .. }
        )
    }

    /// Server-side failure the client may retry unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageError(_) | Self::Internal(_))
    }
}

impl From<VerifyError> for CeremonyError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::ChallengeMismatch => Self::ChallengeMismatch,
            VerifyError::OriginMismatch(origin) => Self::OriginMismatch(origin),
            VerifyError::CeremonyTypeMismatch => Self::CeremonyTypeMismatch,
            VerifyError::RpIdMismatch => Self::RpIdMismatch,
            VerifyError::UserNotPresent => Self::UserNotPresent,
            VerifyError::UserNotVerified => Self::UserNotVerified,
            VerifyError::Rejected(reason) => Self::SignatureInvalid(reason),
            VerifyError::Malformed(reason) => Self::MalformedResponse(reason),
            VerifyError::Unavailable(reason) => Self::Internal(reason),
        }
    }
}

impl From<ResponseError> for CeremonyError {
    fn from(err: ResponseError) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

impl From<RegistryError> for CeremonyError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Duplicate(id) => Self::DuplicateCredential(id),
            RegistryError::Backend(msg) => Self::StorageError(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, CeremonyError>;
