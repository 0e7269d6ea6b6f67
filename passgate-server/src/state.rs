//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use passgate_core::{
    CeremonyError, Ceremonies, ConfigError, Identity, IdentityDirectory, WebAuthnVerifier,
};

use crate::auth::TokenIssuer;
use crate::config::Config;
use crate::db::Backends;
use crate::error::ApiError;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Registration and login ceremonies (own the challenge sessions)
    pub ceremonies: Arc<Ceremonies>,
    /// User directory the ceremonies look identities up in
    pub directory: Arc<dyn IdentityDirectory>,
    /// Signs session tokens after a successful login
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    /// Wire the ceremonies to the given storage backends.
    pub fn new(config: &Config, backends: Backends) -> Result<Self, ConfigError> {
        let rp = config.relying_party()?;
        let verifier = WebAuthnVerifier::new(&rp)?;

        let ceremonies = Ceremonies::builder(rp, backends.registry, Arc::new(verifier))
        .session_ttl(config.session_ttl())
        .counter_policy(config.counter_policy)
        .build();

        Ok(Self {
            ceremonies: Arc::new(ceremonies),
            directory: backends.directory,
            tokens: Arc::new(TokenIssuer::new(
                config.jwt_secret.as_bytes(),
                std::time::Duration::from_secs(config.jwt_ttl_secs),
            )),
        })
    }

    /// Look up the identity a ceremony request names.
    pub async fn identity(&self, username: &str) -> Result<Identity, ApiError> {
        self.directory
            .find_by_username(username)
            .await
            .map_err(CeremonyError::from)?
            .ok_or_else(|| CeremonyError::IdentityNotFound(username.to_string()).into())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ceremonies", &self.ceremonies)
            .field("tokens", &self.tokens)
            .finish()
    }
}
