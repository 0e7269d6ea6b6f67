//! Base64 helpers for WebAuthn wire values.
//!
//! Everything this crate emits is base64url without padding. Browsers and
//! client libraries are less consistent, so decoding accepts padded input and
//! the standard alphabet too.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

/// Base64url encode bytes
pub fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url or standard base64, padded or not.
pub fn b64_decode_lenient(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = input
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_NO_PAD.decode(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_accepts_all_common_variants() {
        let bytes = [0xfbu8, 0xff, 0xbf, 0x00, 0x10];
        let url_no_pad = "-_-_ABA";
        let url_padded = "-_-_ABA=";
        let standard = "+/+/ABA=";

        assert_eq!(b64_decode_lenient(url_no_pad).unwrap(), bytes);
        assert_eq!(b64_decode_lenient(url_padded).unwrap(), bytes);
        assert_eq!(b64_decode_lenient(standard).unwrap(), bytes);
        assert_eq!(b64url_encode(&bytes), url_no_pad);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(b64_decode_lenient("not base64!").is_err());
    }
}
