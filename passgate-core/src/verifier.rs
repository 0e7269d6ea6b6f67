//! Verifier capability consumed by the ceremonies
//!
//! The ceremonies never parse CBOR or check signatures themselves. They ask a
//! [`CeremonyVerifier`] for options plus the opaque state that goes with them,
//! park that state in the session store, and hand it back with the client's
//! response on finish. The bundled implementation is
//! [`crate::webauthn::WebAuthnVerifier`].

use webauthn_rs::prelude::{
    AuthenticationResult, CreationChallengeResponse, Passkey, PasskeyAuthentication,
    PasskeyRegistration, RequestChallengeResponse,
};

use crate::credential::CredentialId;
use crate::identity::Identity;
use crate::response::{AssertionResponse, AttestationResponse};

/// Verification failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
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

    /// Signature, attestation or authenticator data did not verify
    #[error("Response rejected: {0}")]
    Rejected(String),

    #[error("Malformed data: {0}")]
    Malformed(String),

    /// Options could not be issued
    #[error("Verifier unavailable: {0}")]
    Unavailable(String),
}

pub trait CeremonyVerifier: Send + Sync {
    /// Creation options for `identity`, listing `exclude` so the
    /// authenticator does not register a second credential for the same user.
    fn start_registration(
        &self,
        identity: &Identity,
        exclude: &[CredentialId],
    ) -> Result<(CreationChallengeResponse, PasskeyRegistration), VerifyError>;

    /// Validate a registration response against the state saved by
    /// [`Self::start_registration`].
    fn finish_registration(
        &self,
        response: &AttestationResponse,
        state: &PasskeyRegistration,
    ) -> Result<Passkey, VerifyError>;

    /// Request options allowing any of `passkeys`.
    fn start_authentication(
        &self,
        passkeys: &[Passkey],
    ) -> Result<(RequestChallengeResponse, PasskeyAuthentication), VerifyError>;

    /// Validate a login response against the state saved by
    /// [`Self::start_authentication`]. The reported counter is returned
    /// unjudged; the counter guard decides on it.
    fn finish_authentication(
        &self,
        response: &AssertionResponse,
        state: &PasskeyAuthentication,
    ) -> Result<AuthenticationResult, VerifyError>;
}
