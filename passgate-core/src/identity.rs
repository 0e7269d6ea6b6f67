//! Identities owned by the external user directory.
//!
//! The ceremonies only read identities. Creating and deleting users belongs to
//! the surrounding administration system.

use async_trait::async_trait;
use uuid::Uuid;

use crate::store::RegistryError;

/// User as seen by the ceremonies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    /// Unique; keys the pending challenge sessions
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub passkey_verified: bool,
}

impl Identity {
    pub fn new(user_id: i64, username: &str, display_name: &str, role: &str) -> Self {
        Self {
            user_id,
            username: username.to_string(),
            display_name: display_name.to_string(),
            role: role.to_string(),
            passkey_verified: false,
        }
    }

    /// WebAuthn user handle: the big-endian user id in the low half of a UUID
    pub fn user_handle(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        bytes[8..].copy_from_slice(&self.user_id.to_be_bytes());
        Uuid::from_bytes(bytes)
    }
}

/// Read access to the user directory
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, RegistryError>;

    /// Flag the identity as having completed a passkey registration.
    async fn mark_passkey_verified(&self, user_id: i64) -> Result<(), RegistryError>;

    /// Check backend health (always Ok for in-process directories)
    async fn check_health(&self) -> Result<(), RegistryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_handle_is_stable_per_user() {
        let alice = Identity::new(1, "alice", "Alice Martin", "teacher");
        let handle = alice.user_handle();
        assert_eq!(handle.as_bytes()[..8], [0u8; 8]);
        assert_eq!(handle.as_bytes()[8..], 1i64.to_be_bytes());
        assert_eq!(handle, alice.clone().user_handle());

        let bob = Identity::new(2, "bob", "Bob Durand", "parent");
        assert_ne!(handle, bob.user_handle());
    }
}
