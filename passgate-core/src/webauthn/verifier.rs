use serde::Deserialize;
use url::Url;
use webauthn_rs::prelude::*;

use crate::config::{ConfigError, RelyingPartyConfig};
use crate::credential::CredentialId;
use crate::identity::Identity;
use crate::response::{AssertionResponse, AttestationResponse};
use crate::verifier::{CeremonyVerifier, VerifyError};

/// [`CeremonyVerifier`] backed by a webauthn-rs [`Webauthn`] instance.
pub struct WebAuthnVerifier {
    webauthn: Webauthn,
    rp: RelyingPartyConfig,
}

/// The one client data field checked here; webauthn-rs checks the rest.
#[derive(Deserialize)]
struct ClientOrigin {
    origin: String,
}

impl WebAuthnVerifier {
    /// Build the verifier for a relying party
    ///
    /// Every accepted origin is registered with webauthn-rs. Subdomains of
    /// the rp id are not accepted.
    pub fn new(rp: &RelyingPartyConfig) -> Result<Self, ConfigError> {
        let origins = rp
            .origins()
            .iter()
            .map(|origin| {
                Url::parse(origin).map_err(|e| ConfigError::InvalidOrigin {
                    origin: origin.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<Url>, ConfigError>>()?;
        let (primary, extra) = origins.split_first().ok_or(ConfigError::NoOrigins)?;

        let mut builder = WebauthnBuilder::new(rp.rp_id(), primary)
            .map_err(|e| ConfigError::Webauthn(e.to_string()))?
            .rp_name(rp.rp_name())
            .allow_subdomains(false);
        for origin in extra {
            builder = builder.append_allowed_origin(origin);
        }

        Ok(Self {
            webauthn: builder
                .build()
                .map_err(|e| ConfigError::Webauthn(e.to_string()))?,
            rp: rp.clone(),
        })
    }

    /// Get the underlying Webauthn instance
    pub fn webauthn(&self) -> &Webauthn {
        &self.webauthn
    }

    /// Reject any origin that is not byte-for-byte an accepted origin.
    ///
    /// webauthn-rs compares parsed URLs, which lets a path or a change of
    /// letter case through.
    fn check_origin(&self, client_data_json: &[u8]) -> Result<(), VerifyError> {
        let client: ClientOrigin = serde_json::from_slice(client_data_json)
            .map_err(|e| VerifyError::Malformed(format!("clientDataJSON: {}", e)))?;
        if self.rp.accepts_origin(&client.origin) {
            Ok(())
        } else {
            Err(VerifyError::OriginMismatch(client.origin))
        }
    }
}

impl CeremonyVerifier for WebAuthnVerifier {
    fn start_registration(
        &self,
        identity: &Identity,
        exclude: &[CredentialId],
    ) -> Result<(CreationChallengeResponse, PasskeyRegistration), VerifyError> {
        let exclude: Option<Vec<CredentialID>> = (!exclude.is_empty()).then(|| {
            exclude
                .iter()
                .map(|id| CredentialID::from(id.as_bytes().to_vec()))
                .collect()
        });

        self.webauthn
            .start_passkey_registration(
                identity.user_handle(),
                &identity.username,
                &identity.display_name,
                exclude,
            )
            .map_err(|e| VerifyError::Unavailable(e.to_string()))
    }

    fn finish_registration(
        &self,
        response: &AttestationResponse,
        state: &PasskeyRegistration,
    ) -> Result<Passkey, VerifyError> {
        self.check_origin(&response.client_data_json)?;
        self.webauthn
            .finish_passkey_registration(&response.credential, state)
            .map_err(rejection)
    }

    fn start_authentication(
        &self,
        passkeys: &[Passkey],
    ) -> Result<(RequestChallengeResponse, PasskeyAuthentication), VerifyError> {
        self.webauthn
            .start_passkey_authentication(passkeys)
            .map_err(|e| VerifyError::Unavailable(e.to_string()))
    }

    fn finish_authentication(
        &self,
        response: &AssertionResponse,
        state: &PasskeyAuthentication,
    ) -> Result<AuthenticationResult, VerifyError> {
        self.check_origin(&response.client_data_json)?;
        self.webauthn
            .finish_passkey_authentication(&response.credential, state)
            .map_err(rejection)
    }
}

impl std::fmt::Debug for WebAuthnVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebAuthnVerifier")
            .field("webauthn", &"<Webauthn instance>")
            .field("rp_id", &self.rp.rp_id())
            .finish()
    }
}

/// Translate a finish failure into the checks the ceremonies report on.
fn rejection(err: WebauthnError) -> VerifyError {
    match err {
        WebauthnError::MismatchedChallenge => VerifyError::ChallengeMismatch,
        WebauthnError::InvalidRPOrigin => VerifyError::OriginMismatch(err.to_string()),
        WebauthnError::InvalidClientDataType => VerifyError::CeremonyTypeMismatch,
        WebauthnError::InvalidRPIDHash => VerifyError::RpIdMismatch,
        WebauthnError::UserNotPresent => VerifyError::UserNotPresent,
        WebauthnError::UserNotVerified => VerifyError::UserNotVerified,
        other => VerifyError::Rejected(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::b64url_encode;

    fn rp(origins: &[&str]) -> RelyingPartyConfig {
        RelyingPartyConfig::new("localhost", "School Portal", origins).unwrap()
    }

    #[test]
    fn test_verifier_registers_every_origin() {
        let verifier =
            WebAuthnVerifier::new(&rp(&["http://localhost:3000", "http://localhost:5173"]))
                .unwrap();
        let allowed = verifier.webauthn().get_allowed_origins();
        for origin in ["http://localhost:3000", "http://localhost:5173"] {
            assert!(allowed.contains(&Url::parse(origin).unwrap()));
        }
    }

    #[test]
    fn test_registration_options_carry_identity_and_exclusions() {
        let verifier = WebAuthnVerifier::new(&rp(&["http://localhost:3000"])).unwrap();
        let alice = Identity::new(1, "alice", "Alice Martin", "teacher");
        let existing = CredentialId::new(vec![7u8; 32]);

        let (options, _) = verifier.start_registration(&alice, &[existing.clone()]).unwrap();
        let json = serde_json::to_value(&options).unwrap();
        let public_key = &json["publicKey"];
        assert_eq!(public_key["rp"]["id"], "localhost");
        assert_eq!(public_key["rp"]["name"], "School Portal");
        assert_eq!(public_key["user"]["name"], "alice");
        assert_eq!(public_key["user"]["displayName"], "Alice Martin");
        assert_eq!(
            public_key["user"]["id"],
            b64url_encode(alice.user_handle().as_bytes())
        );
        assert_eq!(
            public_key["excludeCredentials"][0]["id"],
            existing.to_base64url()
        );
    }

    #[test]
    fn test_check_origin_is_exact() {
        let verifier = WebAuthnVerifier::new(&rp(&["http://localhost:3000"])).unwrap();
        let client_data =
            |origin: &str| serde_json::to_vec(&serde_json::json!({ "origin": origin })).unwrap();

        assert!(verifier.check_origin(&client_data("http://localhost:3000")).is_ok());
        for origin in ["http://localhost:3000/login", "HTTP://localhost:3000"] {
            assert_eq!(
                verifier.check_origin(&client_data(origin)),
                Err(VerifyError::OriginMismatch(origin.to_string()))
            );
        }
        assert!(matches!(
            verifier.check_origin(b"not json"),
            Err(VerifyError::Malformed(_))
        ));
    }
}
