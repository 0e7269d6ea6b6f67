//! Passgate Core - passkey registration and login ceremonies
//!
//! This crate implements the server side of WebAuthn passkey ceremonies for a
//! school administration backend: issuing challenges, verifying what the
//! authenticator signed, storing credentials and guarding sign counters
//! against cloned authenticators.
//!
//! # Features
//!
//! - Challenge sessions keyed by (username, ceremony), single use, self expiring
//! - Credential registry behind an async trait (memory backend included)
//! - Attestation and assertion checks delegated to webauthn-rs, behind the
//!   [`CeremonyVerifier`] seam
//! - Sign counter guard with atomic compare-and-set updates
//! - Security events for suspected cloned authenticators
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use passgate_core::{
//!     Ceremonies, Identity, MemoryCredentialRegistry, RelyingPartyConfig, WebAuthnVerifier,
//! };
//!
//! # async fn example(client_response: serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
//! let rp = RelyingPartyConfig::new("localhost", "School Portal", ["http://localhost:3000"])?;
//! let verifier = WebAuthnVerifier::new(&rp)?;
//! let ceremonies = Ceremonies::builder(
//!     rp,
//!     Arc::new(MemoryCredentialRegistry::new()),
//!     Arc::new(verifier),
//! )
//! .build();
//!
//! let alice = Identity::new(1, "alice", "Alice Martin", "teacher");
//! let options = ceremonies.registration().begin(&alice).await?;
//! // ... send `options` to the browser, receive `client_response` ...
//! ceremonies.registration().finish(&alice, &client_response).await?;
//! # Ok(())
//! # }
//! ```

pub mod ceremony;
pub mod challenge;
pub mod config;
pub mod counter;
pub mod credential;
pub mod encoding;
pub mod error;
pub mod events;
pub mod identity;
pub mod response;
pub mod store;
pub mod verifier;
pub mod webauthn;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export main types for convenience
pub use ceremony::{
    AuthenticatedCredential, AuthenticationCeremony, Ceremonies, CeremoniesBuilder,
    RegisteredCredential, RegistrationCeremony,
};
pub use challenge::{Challenge, MIN_CHALLENGE_LEN};
pub use config::{ConfigError, RelyingPartyConfig};
pub use counter::{CounterDecision, CounterPolicy, SignCounterGuard};
pub use credential::{Credential, CredentialId};
pub use error::{CeremonyError, Result};
pub use events::{RecordingEventSink, SecurityEvent, SecurityEventSink, TracingEventSink};
pub use identity::{Identity, IdentityDirectory};
pub use response::{AssertionResponse, AttestationResponse, ResponseError};
pub use store::{
    CeremonyKind, CeremonyState, ChallengeSessionStore, CredentialRegistry,
    MemoryCredentialRegistry, MemoryIdentityDirectory, RegistryError, DEFAULT_SESSION_TTL,
};
pub use verifier::{CeremonyVerifier, VerifyError};
pub use webauthn::WebAuthnVerifier;
pub use webauthn_rs::prelude::{CreationChallengeResponse, RequestChallengeResponse};
