//! Software authenticator for tests
//!
//! Produces genuine ES256 registrations and assertions in the JSON shape a
//! browser posts back, so the ceremonies and the HTTP layer can be exercised
//! end to end without hardware. Keys are derived from a seed byte and are
//! therefore deterministic.
//!
//! **Warning:** for testing only. Never use in production.

use ciborium::value::Value;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use serde_json::{json, Value as Json};
use sha2::{Digest, Sha256};

use crate::credential::CredentialId;
use crate::encoding::b64url_encode;

const AAGUID: [u8; 16] = *b"passgate-softkey";

/// Attestation statement format produced by [`SoftAuthenticator::make_credential_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftAttestation {
    None,
    /// Self attestation signed with the credential key
    Packed,
}

#[derive(Clone)]
pub struct SoftAuthenticator {
    signing_key: SigningKey,
    credential_id: Vec<u8>,
    rp_id: String,
    origin: String,
    counter: u32,
    counter_step: u32,
    user_present: bool,
    user_verified: bool,
    user_handle: Option<Vec<u8>>,
}

impl SoftAuthenticator {
    /// Create an authenticator for `rp_id` that reports `origin` in its
    /// client data. Different seeds give different keys and credential ids.
    pub fn new(seed: u8, rp_id: &str, origin: &str) -> Self {
        // Any non-zero scalar below the group order is a valid key
        let signing_key = SigningKey::from_slice(&[seed.max(1); 32])
            .expect("constant seed is a valid P-256 scalar");
        let mut id_material = b"credential".to_vec();
        id_material.push(seed);
        let credential_id = Sha256::digest(&id_material).to_vec();

        Self {
            signing_key,
            credential_id,
            rp_id: rp_id.to_string(),
            origin: origin.to_string(),
            counter: 0,
            counter_step: 1,
            user_present: true,
            user_verified: true,
            user_handle: None,
        }
    }

    /// Amount added to the counter on every assertion. Zero models an
    /// authenticator without counter support.
    pub fn with_counter_step(mut self, step: u32) -> Self {
        self.counter_step = step;
        self
    }

    pub fn with_origin(mut self, origin: &str) -> Self {
        self.origin = origin.to_string();
        self
    }

    pub fn with_rp_id(mut self, rp_id: &str) -> Self {
        self.rp_id = rp_id.to_string();
        self
    }

    pub fn without_user_presence(mut self) -> Self {
        self.user_present = false;
        self
    }

    pub fn without_user_verification(mut self) -> Self {
        self.user_verified = false;
        self
    }

    pub fn with_user_handle(mut self, handle: &[u8]) -> Self {
        self.user_handle = Some(handle.to_vec());
        self
    }

    /// Force the internal counter, e.g. to replay an old value.
    pub fn set_counter(&mut self, counter: u32) {
        self.counter = counter;
    }

    pub fn credential_id(&self) -> CredentialId {
        CredentialId::new(self.credential_id.clone())
    }

    /// COSE_Key encoding of the public key (kty=2, alg=-7, crv=1, x, y)
    pub fn cose_public_key(&self) -> Vec<u8> {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let x = point.x().map(|x| x.to_vec()).unwrap_or_default();
        let y = point.y().map(|y| y.to_vec()).unwrap_or_default();
        let map = Value::Map(vec![
            (Value::Integer(1i64.into()), Value::Integer(2i64.into())),
            (Value::Integer(3i64.into()), Value::Integer((-7i64).into())),
            (Value::Integer((-1i64).into()), Value::Integer(1i64.into())),
            (Value::Integer((-2i64).into()), Value::Bytes(x)),
            (Value::Integer((-3i64).into()), Value::Bytes(y)),
        ]);
        cbor(&map)
    }

    /// `clientDataJSON` bytes for the given ceremony type and challenge
    pub fn client_data(&self, kind: &str, challenge: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "type": kind,
            "challenge": challenge,
            "origin": self.origin,
            "crossOrigin": false,
        }))
        .expect("client data serializes")
    }

    /// Registration response (`none` attestation) for the base64url challenge
    /// found in the creation options.
    pub fn make_credential(&self, challenge: &str) -> Json {
        self.make_credential_with(
            self.client_data("webauthn.create", challenge),
            SoftAttestation::None,
        )
    }

    pub fn make_credential_with(&self, client_data: Vec<u8>, format: SoftAttestation) -> Json {
        let cose_key = self.cose_public_key();
        let mut auth_data = self.auth_data_header(0x40);
        auth_data.extend_from_slice(&AAGUID);
        auth_data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        auth_data.extend_from_slice(&self.credential_id);
        auth_data.extend_from_slice(&cose_key);

        let att_stmt = match format {
            SoftAttestation::None => Value::Map(vec![]),
            SoftAttestation::Packed => {
                let sig = self.sign(&auth_data, &client_data);
                Value::Map(vec![
                    (Value::Text("alg".into()), Value::Integer((-7i64).into())),
                    (Value::Text("sig".into()), Value::Bytes(sig)),
                ])
            }
        };
        let fmt = match format {
            SoftAttestation::None => "none",
            SoftAttestation::Packed => "packed",
        };
        let attestation_object = cbor(&Value::Map(vec![
            (Value::Text("fmt".into()), Value::Text(fmt.into())),
            (Value::Text("attStmt".into()), att_stmt),
            (Value::Text("authData".into()), Value::Bytes(auth_data)),
        ]));

        let id = b64url_encode(&self.credential_id);
        json!({
            "id": id,
            "rawId": id,
            "type": "public-key",
            "response": {
                "clientDataJSON": b64url_encode(&client_data),
                "attestationObject": b64url_encode(&attestation_object),
                "transports": ["internal"],
            }
        })
    }

    /// Login response for the base64url challenge found in the request
    /// options. Advances the counter by the configured step first.
    pub fn get_assertion(&mut self, challenge: &str) -> Json {
        let client_data = self.client_data("webauthn.get", challenge);
        self.get_assertion_with(client_data)
    }

    pub fn get_assertion_with(&mut self, client_data: Vec<u8>) -> Json {
        self.counter = self.counter.wrapping_add(self.counter_step);
        let auth_data = self.auth_data_header(0);
        let signature = self.sign(&auth_data, &client_data);

        let id = b64url_encode(&self.credential_id);
        json!({
            "id": id,
            "rawId": id,
            "type": "public-key",
            "response": {
                "clientDataJSON": b64url_encode(&client_data),
                "authenticatorData": b64url_encode(&auth_data),
                "signature": b64url_encode(&signature),
                "userHandle": self.user_handle.as_deref().map(b64url_encode),
            }
        })
    }

    fn auth_data_header(&self, extra_flags: u8) -> Vec<u8> {
        let mut flags = extra_flags;
        if self.user_present {
            flags |= 0x01;
        }
        if self.user_verified {
            flags |= 0x04;
        }
        let mut data = Sha256::digest(self.rp_id.as_bytes()).to_vec();
        data.push(flags);
        data.extend_from_slice(&self.counter.to_be_bytes());
        data
    }

    /// DER ECDSA signature over `auth_data || SHA-256(client_data)`
    fn sign(&self, auth_data: &[u8], client_data: &[u8]) -> Vec<u8> {
        let mut message = auth_data.to_vec();
        message.extend_from_slice(&Sha256::digest(client_data));
        let signature: Signature = self.signing_key.sign(&message);
        signature.to_der().as_bytes().to_vec()
    }
}

impl std::fmt::Debug for SoftAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftAuthenticator")
            .field("credential_id", &self.credential_id())
            .field("rp_id", &self.rp_id)
            .field("origin", &self.origin)
            .field("counter", &self.counter)
            .finish()
    }
}

fn cbor(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).expect("CBOR encoding into a Vec is infallible");
    buf
}

/// Replace the last byte of a base64url field inside a posted response.
/// Used to corrupt signatures and client data in negative tests.
pub fn tamper_field(response: &mut Json, field: &str) {
    let Some(encoded) = response["response"][field].as_str() else {
        return;
    };
    let Ok(mut bytes) = crate::encoding::b64_decode_lenient(encoded) else {
        return;
    };
    if let Some(last) = bytes.last_mut() {
        *last ^= 0x01;
    }
    response["response"][field] = Json::String(b64url_encode(&bytes));
}
