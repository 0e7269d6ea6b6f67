use std::sync::Arc;

use serde_json::Value;
use webauthn_rs::prelude::CreationChallengeResponse;

use super::CeremonyContext;
use crate::challenge::Challenge;
use crate::credential::{Credential, CredentialId};
use crate::error::{CeremonyError, Result};
use crate::identity::Identity;
use crate::response::AttestationResponse;
use crate::store::{CeremonyKind, CeremonyState};

/// Summary of a credential stored by [`RegistrationCeremony::finish`]
#[derive(Debug, Clone)]
pub struct RegisteredCredential {
    pub credential_id: CredentialId,
    pub sign_count: u64,
}

/// Adds a new credential to an existing identity.
pub struct RegistrationCeremony {
    context: Arc<CeremonyContext>,
}

impl RegistrationCeremony {
    pub(crate) fn new(context: Arc<CeremonyContext>) -> Self {
        Self { context }
    }

    /// Issue creation options and remember the challenge.
    ///
    /// Credentials the identity already owns are listed in
    /// `excludeCredentials` so the authenticator does not register twice.
    pub async fn begin(&self, identity: &Identity) -> Result<CreationChallengeResponse> {
        let ctx = &self.context;
        let existing: Vec<CredentialId> = ctx
            .registry
            .list_for_user(identity.user_id)
            .await?
            .into_iter()
            .map(|c| c.credential_id)
            .collect();

        let (options, state) = ctx.verifier.start_registration(identity, &existing)?;
        let challenge = Challenge::from_bytes(options.public_key.challenge.to_vec())
            .ok_or_else(|| CeremonyError::Internal("issued challenge too short".to_string()))?;

        let session = ctx.sessions.open(
            &identity.username,
            challenge,
            CeremonyState::Registration(state),
            identity.user_id,
        );
        if ctx.sessions.put(session).is_some() {
            tracing::debug!(username = %identity.username, "Replaced pending registration session");
        }

        tracing::info!(
            username = %identity.username,
            user_id = identity.user_id,
            excluded = existing.len(),
            "Passkey registration started"
        );
        Ok(options)
    }

    /// Verify the posted registration response and store the new credential.
    ///
    /// The pending session is consumed whatever the outcome, including a
    /// response that does not parse; a failed attempt must start over with
    /// `begin`.
    pub async fn finish(
        &self,
        identity: &Identity,
        response: &Value,
    ) -> Result<RegisteredCredential> {
        let ctx = &self.context;
        let session = ctx
            .sessions
            .take(&identity.username, CeremonyKind::Registration)?;
        if session.user_id != identity.user_id {
            return Err(CeremonyError::SessionNotFound(CeremonyKind::Registration));
        }
        let CeremonyState::Registration(state) = &session.state else {
            return Err(CeremonyError::SessionNotFound(CeremonyKind::Registration));
        };

        let response = AttestationResponse::from_json(response)?;
        let passkey = ctx
            .verifier
            .finish_registration(&response, state)
            .map_err(|e| {
                tracing::warn!(username = %identity.username, error = %e, "Attestation rejected");
                CeremonyError::from(e)
            })?;

        let credential = Credential::from_passkey(identity.user_id, &passkey)?;
        let credential_id = credential.credential_id.clone();
        ctx.registry.insert(credential).await?;

        tracing::info!(
            username = %identity.username,
            credential_id = %credential_id,
            "Passkey registered"
        );

        Ok(RegisteredCredential {
            credential_id,
            sign_count: 0,
        })
    }
}
