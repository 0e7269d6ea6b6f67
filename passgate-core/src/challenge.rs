//! Ceremony challenges issued with the creation and request options.

use crate::encoding::b64url_encode;

/// Shortest challenge this crate will accept
pub const MIN_CHALLENGE_LEN: usize = 16;

/// Random challenge bound to one pending ceremony
#[derive(Clone, PartialEq, Eq)]
pub struct Challenge(Vec<u8>);

impl Challenge {
    /// Wrap issued challenge bytes, enforcing the minimum length.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        (bytes.len() >= MIN_CHALLENGE_LEN).then_some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64url form, as it appears in options payloads and client data
    pub fn to_base64url(&self) -> String {
        b64url_encode(&self.0)
    }
}

impl std::fmt::Debug for Challenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Challenge").field(&self.to_base64url()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_enforces_minimum() {
        assert!(Challenge::from_bytes(vec![1u8; MIN_CHALLENGE_LEN - 1]).is_none());
        assert!(Challenge::from_bytes(vec![1u8; MIN_CHALLENGE_LEN]).is_some());
    }

    #[test]
    fn test_debug_shows_base64url() {
        let challenge = Challenge::from_bytes(vec![0xfb; 16]).unwrap();
        assert_eq!(challenge.to_base64url(), "-_v7-_v7-_v7-_v7-_v7-w");
        assert_eq!(
            format!("{:?}", challenge),
            "Challenge(\"-_v7-_v7-_v7-_v7-_v7-w\")"
        );
    }
}
