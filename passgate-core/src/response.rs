//! Client response adapter
//!
//! Turns the JSON a browser posts back after `navigator.credentials.*` into
//! the credential types webauthn-rs verifies. Two layouts are accepted:
//!
//! - flat: `{"rawId": ..., "clientDataJSON": ..., "attestationObject": ...}`
//! - a full `PublicKeyCredential`: `{"id", "rawId", "type", "response": {...}}`
//!
//! Both are rebuilt into the full layout before deserializing. Binary fields
//! may use base64url or standard base64, padded or not.

use serde_json::{json, Map, Value};
use webauthn_rs::prelude::{PublicKeyCredential, RegisterPublicKeyCredential};
use webauthn_rs_proto::AuthenticatorTransport;

use crate::credential::CredentialId;
use crate::encoding::{b64_decode_lenient, b64url_encode};

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("Invalid response JSON: {0}")]
    Json(String),
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Field {field} is not valid base64: {reason}")]
    Base64 { field: &'static str, reason: String },
    #[error("Unexpected credential type: {0}")]
    CredentialType(String),
}

/// Registration response ready for verification
#[derive(Debug)]
pub struct AttestationResponse {
    pub credential: RegisterPublicKeyCredential,
    pub credential_id: CredentialId,
    /// Decoded `clientDataJSON`
    pub client_data_json: Vec<u8>,
}

/// Login response ready for verification
#[derive(Debug)]
pub struct AssertionResponse {
    pub credential: PublicKeyCredential,
    pub credential_id: CredentialId,
    /// Decoded `clientDataJSON`
    pub client_data_json: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}

/// Fields of the inner `response` object a layout must carry
const ATTESTATION_FIELDS: [&str; 2] = ["clientDataJSON", "attestationObject"];
const ASSERTION_FIELDS: [&str; 3] = ["clientDataJSON", "authenticatorData", "signature"];

/// A posted credential rebuilt into the `PublicKeyCredential` layout
struct Reshaped {
    credential_id: Vec<u8>,
    client_data_json: Vec<u8>,
    user_handle: Option<Vec<u8>>,
    value: Value,
}

impl AttestationResponse {
    pub fn from_json(value: &Value) -> Result<Self, ResponseError> {
        let mut reshaped = reshape(value, &ATTESTATION_FIELDS)?;
        if let Some(transports) = known_transports(value) {
            reshaped.value["response"]["transports"] = transports;
        }

        Ok(Self {
            credential: serde_json::from_value(reshaped.value)
                .map_err(|e| ResponseError::Json(e.to_string()))?,
            credential_id: CredentialId::new(reshaped.credential_id),
            client_data_json: reshaped.client_data_json,
        })
    }
}

impl AssertionResponse {
    pub fn from_json(value: &Value) -> Result<Self, ResponseError> {
        let reshaped = reshape(value, &ASSERTION_FIELDS)?;

        Ok(Self {
            credential: serde_json::from_value(reshaped.value)
                .map_err(|e| ResponseError::Json(e.to_string()))?,
            credential_id: CredentialId::new(reshaped.credential_id),
            client_data_json: reshaped.client_data_json,
            user_handle: reshaped.user_handle,
        })
    }
}

fn reshape(value: &Value, fields: &[&'static str]) -> Result<Reshaped, ResponseError> {
    let outer = value
        .as_object()
        .ok_or_else(|| ResponseError::Json("expected a JSON object".to_string()))?;

    if let Some(kind) = outer.get("type").and_then(Value::as_str) {
        if kind != "public-key" {
            return Err(ResponseError::CredentialType(kind.to_string()));
        }
    }

    let inner = match outer.get("response").and_then(Value::as_object) {
        Some(inner) => inner,
        None => outer,
    };

    let raw_id = ["rawId", "id"]
        .iter()
        .find_map(|key| outer.get(*key).or_else(|| inner.get(*key)))
        .and_then(Value::as_str)
        .ok_or(ResponseError::MissingField("rawId"))?;
    let credential_id = decode("rawId", raw_id)?;

    let mut response = Map::new();
    let mut client_data_json = Vec::new();
    for &field in fields {
        let encoded = inner
            .get(field)
            .and_then(Value::as_str)
            .ok_or(ResponseError::MissingField(field))?;
        let bytes = decode(field, encoded)?;
        // Re-encode so every binary field reaches the verifier in one alphabet
        response.insert(field.to_string(), Value::String(b64url_encode(&bytes)));
        if field == "clientDataJSON" {
            client_data_json = bytes;
        }
    }

    let user_handle = match inner.get("userHandle").and_then(Value::as_str) {
        Some(handle) if !handle.is_empty() => Some(decode("userHandle", handle)?),
        _ => None,
    };
    if let Some(handle) = &user_handle {
        response.insert("userHandle".to_string(), Value::String(b64url_encode(handle)));
    }

    let id = b64url_encode(&credential_id);
    Ok(Reshaped {
        credential_id,
        client_data_json,
        user_handle,
        value: json!({
            "id": id,
            "rawId": id,
            "type": "public-key",
            "response": response,
            "extensions": {},
        }),
    })
}

fn decode(field: &'static str, encoded: &str) -> Result<Vec<u8>, ResponseError> {
    b64_decode_lenient(encoded).map_err(|e| ResponseError::Base64 {
        field,
        reason: e.to_string(),
    })
}

/// Transport hints the verifier understands; unknown ones are dropped.
fn known_transports(value: &Value) -> Option<Value> {
    let listed = value
        .pointer("/response/transports")
        .or_else(|| value.get("transports"))?
        .as_array()?;
    let known: Vec<Value> = listed
        .iter()
        .filter(|t| serde_json::from_value::<AuthenticatorTransport>((*t).clone()).is_ok())
        .cloned()
        .collect();
    Some(Value::Array(known))
}
