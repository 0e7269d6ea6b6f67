//! Request validation module
//!
//! Checks applied to ceremony requests before any session or registry work.

use crate::error::ApiError;

/// Longest accepted username, in characters
pub const MAX_USERNAME_LEN: usize = 64;

/// Validates and normalizes a username from a ceremony request
///
/// Surrounding whitespace is trimmed. The result must be non-empty, at most
/// [`MAX_USERNAME_LEN`] characters and free of control characters, since it
/// keys the pending challenge sessions.
pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }
    if trimmed.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username too long: maximum is {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ApiError::bad_request(
            "Username contains control characters",
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_trims() {
        assert_eq!(validate_username("  alice ").unwrap(), "alice");
        assert_eq!(validate_username("jean.dupont").unwrap(), "jean.dupont");
    }

    #[test]
    fn test_validate_username_empty() {
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
    }

    #[test]
    fn test_validate_username_too_long() {
        let long = "a".repeat(MAX_USERNAME_LEN + 1);
        assert!(validate_username(&long).is_err());
        assert!(validate_username(&long[..MAX_USERNAME_LEN]).is_ok());
    }

    #[test]
    fn test_validate_username_control_chars() {
        assert!(validate_username("ali\nce").is_err());
        assert!(validate_username("bob\u{0}").is_err());
    }

    #[test]
    fn test_validate_username_error_is_invalid_input() {
        let err = validate_username("").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}
