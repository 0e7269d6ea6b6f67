//! Relying Party identity
//!
//! The server's static identity as a WebAuthn participant: the rp id (a
//! registrable domain), a display name, and the set of origins a client may
//! legitimately report in its client data.

use url::Url;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Relying party id must not be empty")]
    EmptyRpId,
    #[error("At least one accepted origin is required")]
    NoOrigins,
    #[error("Invalid origin URL '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },
    #[error("WebAuthn setup failed: {0}")]
    Webauthn(String),
}

/// Relying Party configuration. Immutable once built.
#[derive(Debug, Clone)]
pub struct RelyingPartyConfig {
    rp_id: String,
    rp_name: String,
    origins: Vec<String>,
}

impl RelyingPartyConfig {
    /// Create a new Relying Party configuration
    ///
    /// # Arguments
    ///
    /// * `rp_id` - Relying Party ID (typically the domain name)
    /// * `rp_name` - Human-readable name shown by the authenticator
    /// * `origins` - Accepted origins, e.g. `https://portal.example.edu`
    pub fn new<I, S>(rp_id: &str, rp_name: &str, origins: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rp_id = rp_id.trim();
        if rp_id.is_empty() {
            return Err(ConfigError::EmptyRpId);
        }

        let mut normalized = Vec::new();
        for origin in origins {
            let origin = normalize_origin(origin.as_ref())?;
            if !normalized.contains(&origin) {
                normalized.push(origin);
            }
        }
        if normalized.is_empty() {
            return Err(ConfigError::NoOrigins);
        }

        Ok(Self {
            rp_id: rp_id.to_string(),
            rp_name: rp_name.to_string(),
            origins: normalized,
        })
    }

    pub fn rp_id(&self) -> &str {
        &self.rp_id
    }

    pub fn rp_name(&self) -> &str {
        &self.rp_name
    }

    /// Accepted origins in normalized `scheme://host[:port]` form
    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    /// Whether a client-reported origin is one of the accepted origins.
    ///
    /// Browsers report the serialized origin, so the comparison is exact:
    /// a path, a trailing slash or different letter case is a different origin.
    pub fn accepts_origin(&self, origin: &str) -> bool {
        self.origins.iter().any(|accepted| accepted == origin)
    }
}

/// Reduce an origin URL to its ASCII serialization and check its scheme.
///
/// Plain `http` is only allowed for loopback hosts.
fn normalize_origin(origin: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidOrigin {
        origin: origin.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(origin.trim()).map_err(|e| invalid(&e.to_string()))?;
    let host = url.host_str().ok_or_else(|| invalid("missing host"))?;

    match url.scheme() {
        "https" => {}
        "http" if matches!(host, "localhost" | "127.0.0.1" | "[::1]") => {}
        other => return Err(invalid(&format!("scheme '{}' not allowed", other))),
    }

    Ok(url.origin().ascii_serialization())
}
