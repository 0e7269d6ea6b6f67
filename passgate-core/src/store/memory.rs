//! In-process credential registry and user directory
//!
//! Used in development (no `DATABASE_URL`) and throughout the tests. Data does
//! not survive a restart.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{CredentialRegistry, RegistryError};
use crate::credential::{Credential, CredentialId};
use crate::identity::{Identity, IdentityDirectory};

/// Credentials keyed by credential id
#[derive(Debug, Default)]
pub struct MemoryCredentialRegistry {
    credentials: DashMap<CredentialId, Credential>,
}

impl MemoryCredentialRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialRegistry for MemoryCredentialRegistry {
    async fn insert(&self, credential: Credential) -> Result<(), RegistryError> {
        match self.credentials.entry(credential.credential_id.clone()) {
            Entry::Occupied(existing) => Err(RegistryError::Duplicate(existing.key().clone())),
            Entry::Vacant(slot) => {
                slot.insert(credential);
                Ok(())
            }
        }
    }

    async fn find(
        &self,
        credential_id: &CredentialId,
    ) -> Result<Option<Credential>, RegistryError> {
        Ok(self.credentials.get(credential_id).map(|c| c.clone()))
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Credential>, RegistryError> {
        let mut creds: Vec<Credential> = self
            .credentials
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        creds.sort_by_key(|c| c.created_at);
        Ok(creds)
    }

    async fn has_credentials(&self, user_id: i64) -> Result<bool, RegistryError> {
        Ok(self.credentials.iter().any(|entry| entry.user_id == user_id))
    }

    async fn compare_and_set_sign_count(
        &self,
        credential_id: &CredentialId,
        expected: u64,
        new_count: u64,
    ) -> Result<bool, RegistryError> {
        // The shard write lock is held for the whole check-and-write
        let Some(mut cred) = self.credentials.get_mut(credential_id) else {
            return Ok(false);
        };
        if cred.sign_count != expected {
            return Ok(false);
        }
        cred.sign_count = new_count;
        cred.last_used_at = Some(Utc::now());
        Ok(true)
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        Ok(self.credentials.len())
    }
}

/// Identities keyed by username
#[derive(Debug, Default)]
pub struct MemoryIdentityDirectory {
    users: DashMap<String, Identity>,
}

impl MemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an identity. Administration lives outside the
    /// ceremonies; this is how tests and development seed users.
    pub fn insert(&self, identity: Identity) {
        self.users.insert(identity.username.clone(), identity);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl IdentityDirectory for MemoryIdentityDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, RegistryError> {
        Ok(self.users.get(username).map(|u| u.clone()))
    }

    async fn mark_passkey_verified(&self, user_id: i64) -> Result<(), RegistryError> {
        if let Some(mut user) = self.users.iter_mut().find(|u| u.user_id == user_id) {
            user.passkey_verified = true;
        }
        Ok(())
    }
}
