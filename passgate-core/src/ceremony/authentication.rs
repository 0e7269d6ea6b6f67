use std::sync::Arc;

use serde_json::Value;
use webauthn_rs::prelude::{Passkey, RequestChallengeResponse};

use super::CeremonyContext;
use crate::challenge::Challenge;
use crate::counter::{CounterDecision, CounterPolicy, SignCounterGuard};
use crate::credential::CredentialId;
use crate::error::{CeremonyError, Result};
use crate::events::{SecurityEvent, SecurityEventSink};
use crate::identity::Identity;
use crate::response::AssertionResponse;
use crate::store::{CeremonyKind, CeremonyState};

/// Compare-and-set attempts before giving up on a contended counter
const MAX_COUNTER_ATTEMPTS: usize = 3;

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct AuthenticatedCredential {
    pub credential_id: CredentialId,
    pub user_id: i64,
    /// Counter value now stored for the credential
    pub sign_count: u64,
    pub user_verified: bool,
}

/// Proves possession of a registered credential.
pub struct AuthenticationCeremony {
    context: Arc<CeremonyContext>,
    guard: SignCounterGuard,
    events: Arc<dyn SecurityEventSink>,
}

impl AuthenticationCeremony {
    pub(crate) fn new(
        context: Arc<CeremonyContext>,
        guard: SignCounterGuard,
        events: Arc<dyn SecurityEventSink>,
    ) -> Self {
        Self {
            context,
            guard,
            events,
        }
    }

    pub fn counter_policy(&self) -> CounterPolicy {
        self.guard.policy()
    }

    /// Issue request options listing the identity's credentials.
    pub async fn begin(&self, identity: &Identity) -> Result<RequestChallengeResponse> {
        let ctx = &self.context;
        let credentials = ctx.registry.list_for_user(identity.user_id).await?;
        if credentials.is_empty() {
            return Err(CeremonyError::NoCredentialsRegistered(
                identity.username.clone(),
            ));
        }
        let passkeys = credentials
            .iter()
            .map(|c| c.passkey())
            .collect::<Result<Vec<Passkey>>>()?;
        let allowed: Vec<CredentialId> = credentials.into_iter().map(|c| c.credential_id).collect();

        let (options, state) = ctx.verifier.start_authentication(&passkeys)?;
        let challenge = Challenge::from_bytes(options.public_key.challenge.to_vec())
            .ok_or_else(|| CeremonyError::Internal("issued challenge too short".to_string()))?;

        let mut session = ctx.sessions.open(
            &identity.username,
            challenge,
            CeremonyState::Authentication(state),
            identity.user_id,
        );
        session.allowed_credentials = allowed;
        if ctx.sessions.put(session).is_some() {
            tracing::debug!(username = %identity.username, "Replaced pending login session");
        }

        tracing::info!(username = %identity.username, "Passkey login started");
        Ok(options)
    }

    /// Verify the posted login response and advance the stored sign counter.
    ///
    /// The pending session is consumed before the response is parsed, so a
    /// malformed response cannot leave the challenge open for another try.
    pub async fn finish(
        &self,
        identity: &Identity,
        response: &Value,
    ) -> Result<AuthenticatedCredential> {
        let ctx = &self.context;
        let session = ctx
            .sessions
            .take(&identity.username, CeremonyKind::Authentication)?;
        if session.user_id != identity.user_id {
            return Err(CeremonyError::SessionNotFound(CeremonyKind::Authentication));
        }
        let CeremonyState::Authentication(state) = &session.state else {
            return Err(CeremonyError::SessionNotFound(CeremonyKind::Authentication));
        };

        let response = AssertionResponse::from_json(response)?;
        let credential_id = &response.credential_id;
        let credential = ctx
            .registry
            .find(credential_id)
            .await?
            .ok_or_else(|| CeremonyError::CredentialNotFound(credential_id.clone()))?;

        if credential.user_id != identity.user_id
            || !session.allowed_credentials.contains(credential_id)
        {
            return Err(CeremonyError::CredentialMismatch(credential_id.clone()));
        }
        if let Some(handle) = &response.user_handle {
            if handle.as_slice() != identity.user_handle().as_bytes().as_slice() {
                return Err(CeremonyError::CredentialMismatch(credential_id.clone()));
            }
        }

        let verified = ctx
            .verifier
            .finish_authentication(&response, state)
            .map_err(|e| {
                tracing::warn!(
                    username = %identity.username,
                    credential_id = %credential_id,
                    error = %e,
                    "Assertion rejected"
                );
                CeremonyError::from(e)
            })?;

        let reported = u64::from(verified.counter());
        let sign_count = self
            .advance_counter(identity, credential_id, credential.sign_count, reported)
            .await?;

        tracing::info!(
            username = %identity.username,
            credential_id = %credential_id,
            sign_count,
            "Passkey login succeeded"
        );

        Ok(AuthenticatedCredential {
            credential_id: credential_id.clone(),
            user_id: identity.user_id,
            sign_count,
            user_verified: verified.user_verified(),
        })
    }

    /// Run the counter guard and persist the accepted value with a
    /// compare-and-set. A lost race re-reads the stored counter and decides
    /// again, so two logins replaying one counter value cannot both pass.
    async fn advance_counter(
        &self,
        identity: &Identity,
        credential_id: &CredentialId,
        mut stored: u64,
        reported: u64,
    ) -> Result<u64> {
        let registry = &self.context.registry;

        for _ in 0..MAX_COUNTER_ATTEMPTS {
            let next = match self.guard.decide(stored, reported) {
                CounterDecision::Accept(next) => next,
                CounterDecision::RejectRegression => {
                    self.events.emit(SecurityEvent::PossibleClonedAuthenticator {
                        user_id: identity.user_id,
                        username: identity.username.clone(),
                        credential_id: credential_id.clone(),
                        stored,
                        reported,
                    });
                    return Err(CeremonyError::CounterRegression { stored, reported });
                }
            };

            if registry
                .compare_and_set_sign_count(credential_id, stored, next)
                .await?
            {
                return Ok(next);
            }

            stored = registry
                .find(credential_id)
                .await?
                .ok_or_else(|| CeremonyError::CredentialNotFound(credential_id.clone()))?
                .sign_count;
            tracing::debug!(
                credential_id = %credential_id,
                stored,
                "Sign counter moved concurrently"
            );
        }

        Err(CeremonyError::StorageError(
            "sign counter update kept losing to concurrent logins".to_string(),
        ))
    }
}
