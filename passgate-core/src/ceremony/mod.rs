//! Registration and login ceremonies
//!
//! Both ceremonies are two-step: `begin` issues a challenge and remembers it
//! in the session store, `finish` consumes that session, hands the client's
//! response to the verifier and only then touches the registry.

mod authentication;
mod registration;

use std::sync::Arc;
use std::time::Duration;

pub use authentication::{AuthenticatedCredential, AuthenticationCeremony};
pub use registration::{RegisteredCredential, RegistrationCeremony};

use crate::config::RelyingPartyConfig;
use crate::counter::{CounterPolicy, SignCounterGuard};
use crate::error::Result;
use crate::events::{SecurityEventSink, TracingEventSink};
use crate::identity::Identity;
use crate::store::{ChallengeSessionStore, CredentialRegistry, DEFAULT_SESSION_TTL};
use crate::verifier::CeremonyVerifier;

/// State shared by both ceremonies
pub(crate) struct CeremonyContext {
    pub rp: RelyingPartyConfig,
    pub sessions: ChallengeSessionStore,
    pub registry: Arc<dyn CredentialRegistry>,
    pub verifier: Arc<dyn CeremonyVerifier>,
}

/// The two ceremonies wired to one relying party, session store and registry.
pub struct Ceremonies {
    context: Arc<CeremonyContext>,
    registration: RegistrationCeremony,
    authentication: AuthenticationCeremony,
}

impl Ceremonies {
    pub fn builder(
        rp: RelyingPartyConfig,
        registry: Arc<dyn CredentialRegistry>,
        verifier: Arc<dyn CeremonyVerifier>,
    ) -> CeremoniesBuilder {
        CeremoniesBuilder {
            rp,
            registry,
            verifier,
            session_ttl: DEFAULT_SESSION_TTL,
            counter_policy: CounterPolicy::default(),
            event_sink: Arc::new(TracingEventSink),
        }
    }

    pub fn registration(&self) -> &RegistrationCeremony {
        &self.registration
    }

    pub fn authentication(&self) -> &AuthenticationCeremony {
        &self.authentication
    }

    pub fn relying_party(&self) -> &RelyingPartyConfig {
        &self.context.rp
    }

    pub fn registry(&self) -> &Arc<dyn CredentialRegistry> {
        &self.context.registry
    }

    /// Whether the identity owns at least one credential.
    pub async fn has_passkey(&self, identity: &Identity) -> Result<bool> {
        Ok(self.context.registry.has_credentials(identity.user_id).await?)
    }

    /// Drop lapsed challenge sessions. Returns how many were removed.
    pub fn sweep_expired_sessions(&self) -> usize {
        self.context.sessions.sweep_expired()
    }

    pub fn pending_sessions(&self) -> usize {
        self.context.sessions.len()
    }
}

impl std::fmt::Debug for Ceremonies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ceremonies")
            .field("rp", &self.context.rp)
            .field("sessions", &self.context.sessions)
            .field("counter_policy", &self.authentication.counter_policy())
            .finish()
    }
}

pub struct CeremoniesBuilder {
    rp: RelyingPartyConfig,
    registry: Arc<dyn CredentialRegistry>,
    verifier: Arc<dyn CeremonyVerifier>,
    session_ttl: Duration,
    counter_policy: CounterPolicy,
    event_sink: Arc<dyn SecurityEventSink>,
}

impl CeremoniesBuilder {
    /// Lifetime of an issued challenge (default 5 minutes)
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn counter_policy(mut self, policy: CounterPolicy) -> Self {
        self.counter_policy = policy;
        self
    }

    /// Where possible cloned authenticators are reported (default: tracing)
    pub fn event_sink(mut self, sink: Arc<dyn SecurityEventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub fn build(self) -> Ceremonies {
        let context = Arc::new(CeremonyContext {
            rp: self.rp,
            sessions: ChallengeSessionStore::with_ttl(self.session_ttl),
            registry: self.registry,
            verifier: self.verifier,
        });

        Ceremonies {
            registration: RegistrationCeremony::new(Arc::clone(&context)),
            authentication: AuthenticationCeremony::new(
                Arc::clone(&context),
                SignCounterGuard::new(self.counter_policy),
                self.event_sink,
            ),
            context,
        }
    }
}
