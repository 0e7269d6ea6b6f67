//! Bundled verifier over webauthn-rs
//!
//! Options, challenges and the cryptographic checks come from webauthn-rs in
//! passkey mode, which always requires user verification. On top of that the
//! client's reported origin must match an accepted origin exactly.

mod verifier;

pub use verifier::WebAuthnVerifier;
