//! Ceremony storage
//!
//! Two very different kinds of state live here:
//! - **Challenge sessions** (in-memory only): one pending challenge per
//!   (username, ceremony kind), short-lived and never persisted.
//! - **Credentials**: behind the [`CredentialRegistry`] trait so the server can
//!   back it with PostgreSQL. [`MemoryCredentialRegistry`] is the in-process
//!   implementation used for development and tests.

mod memory;
mod session;

pub use memory::{MemoryCredentialRegistry, MemoryIdentityDirectory};
pub use session::{
    CeremonyKind, CeremonyState, ChallengeSession, ChallengeSessionStore, DEFAULT_SESSION_TTL,
};

use async_trait::async_trait;

use crate::credential::{Credential, CredentialId};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Credential already registered: {0}")]
    Duplicate(CredentialId),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Persistent store of credentials.
///
/// Mutation is exclusive to the ceremonies; other subsystems only ask
/// whether an identity has any credentials.
#[async_trait]
pub trait CredentialRegistry: Send + Sync {
    /// Insert a new credential. An existing credential with the same id, for
    /// any user, is a [`RegistryError::Duplicate`] and is left untouched.
    async fn insert(&self, credential: Credential) -> Result<(), RegistryError>;

    async fn find(&self, credential_id: &CredentialId)
        -> Result<Option<Credential>, RegistryError>;

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Credential>, RegistryError>;

    async fn has_credentials(&self, user_id: i64) -> Result<bool, RegistryError> {
        Ok(!self.list_for_user(user_id).await?.is_empty())
    }

    /// Set the sign counter to `new_count` only if it still equals `expected`.
    ///
    /// Returns `false` when the stored counter moved (or the credential is
    /// gone), in which case nothing was written.
    async fn compare_and_set_sign_count(
        &self,
        credential_id: &CredentialId,
        expected: u64,
        new_count: u64,
    ) -> Result<bool, RegistryError>;

    /// Total number of stored credentials (for stats)
    async fn count(&self) -> Result<usize, RegistryError>;

    /// Check backend health (always Ok for memory backend)
    async fn check_health(&self) -> Result<(), RegistryError> {
        Ok(())
    }

    /// Whether credentials survive a restart
    fn is_persistent(&self) -> bool {
        false
    }
}
