//! Registered public-key credentials

use chrono::{DateTime, Utc};
use webauthn_rs::prelude::Passkey;

use crate::encoding::b64url_encode;
use crate::error::{CeremonyError, Result};

/// Opaque credential identifier chosen by the authenticator.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CredentialId(Vec<u8>);

impl CredentialId {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64url(&self) -> String {
        b64url_encode(&self.0)
    }
}

impl From<Vec<u8>> for CredentialId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64url())
    }
}

impl std::fmt::Debug for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialId({})", self.to_base64url())
    }
}

/// A passkey bound to one identity.
///
/// Created once by a successful registration; afterwards only the sign
/// counter and `last_used_at` move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub credential_id: CredentialId,
    pub user_id: i64,
    /// The verified passkey (COSE public key and algorithm) as JSON
    pub public_key: Vec<u8>,
    pub sign_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(
        credential_id: CredentialId,
        user_id: i64,
        public_key: Vec<u8>,
        sign_count: u64,
    ) -> Self {
        Self {
            credential_id,
            user_id,
            public_key,
            sign_count,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Bind a freshly verified passkey to `user_id`.
    ///
    /// The stored counter starts at zero. It is kept in `sign_count`, not in
    /// the serialized passkey.
    pub fn from_passkey(user_id: i64, passkey: &Passkey) -> Result<Self> {
        let public_key = serde_json::to_vec(passkey)
            .map_err(|e| CeremonyError::Internal(format!("passkey does not serialize: {}", e)))?;
        let credential_id = CredentialId::new(passkey.cred_id().to_vec());
        Ok(Self::new(credential_id, user_id, public_key, 0))
    }

    /// Decode the stored passkey.
    pub fn passkey(&self) -> Result<Passkey> {
        serde_json::from_slice(&self.public_key).map_err(|e| {
            CeremonyError::StorageError(format!(
                "stored passkey {} is unreadable: {}",
                self.credential_id, e
            ))
        })
    }
}
