//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use passgate_core::{ConfigError, CounterPolicy, RelyingPartyConfig};

/// Secret used when `JWT_SECRET` is unset. Only acceptable for local development.
const DEV_JWT_SECRET: &str = "passgate-dev-secret-change-me";

/// Server configuration loaded from environment variables
#[derive(Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in KB (default: 64)
    pub body_limit_kb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// PostgreSQL connection string; in-memory stores when unset
    pub database_url: Option<String>,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
    /// Database connection pool minimum connections (default: 2)
    pub database_min_connections: u32,
    /// Relying party id (default: localhost)
    pub rp_id: String,
    /// Relying party display name (default: School Portal)
    pub rp_name: String,
    /// Origins accepted in client data, comma-separated (default: http://localhost:3000)
    pub rp_origins: Vec<String>,
    /// Lifetime of a pending ceremony challenge in seconds (default: 300)
    pub session_ttl_secs: u64,
    /// Interval between sweeps of expired challenge sessions (default: 60)
    pub session_sweep_secs: u64,
    /// Sign counter policy (default: lenient)
    pub counter_policy: CounterPolicy,
    /// HMAC secret for session tokens issued after login
    pub jwt_secret: String,
    /// Session token lifetime in seconds (default: 8 hours)
    pub jwt_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_kb: 64,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            database_url: None,
            database_max_connections: 20,
            database_min_connections: 2,
            rp_id: "localhost".to_string(),
            rp_name: "School Portal".to_string(),
            rp_origins: vec!["http://localhost:3000".to_string()],
            session_ttl_secs: 300,
            session_sweep_secs: 60,
            counter_policy: CounterPolicy::default(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl_secs: 8 * 3600,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let counter_policy = match std::env::var("COUNTER_POLICY") {
            Ok(value) => CounterPolicy::from_str(&value).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring COUNTER_POLICY, using lenient");
                CounterPolicy::Lenient
            }),
            Err(_) => defaults.counter_policy,
        };

        let jwt_secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                defaults.jwt_secret
            }
        };

        Self {
            port: env_parse("PORT", defaults.port),
            host,
            allowed_origins: env_list("ALLOWED_ORIGINS"),
            body_limit_kb: env_parse("BODY_LIMIT_KB", defaults.body_limit_kb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC", defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", defaults.rate_limit_burst),
            database_url: std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            database_max_connections: env_parse(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            database_min_connections: env_parse(
                "DATABASE_MIN_CONNECTIONS",
                defaults.database_min_connections,
            ),
            rp_id: std::env::var("RP_ID").unwrap_or(defaults.rp_id),
            rp_name: std::env::var("RP_NAME").unwrap_or(defaults.rp_name),
            rp_origins: env_list("RP_ORIGINS").unwrap_or(defaults.rp_origins),
            session_ttl_secs: env_parse("SESSION_TTL_SECS", defaults.session_ttl_secs),
            session_sweep_secs: env_parse("SESSION_SWEEP_SECS", defaults.session_sweep_secs),
            counter_policy,
            jwt_secret,
            jwt_ttl_secs: env_parse("JWT_TTL_SECS", defaults.jwt_ttl_secs),
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Build the relying party identity from the `RP_*` settings.
    pub fn relying_party(&self) -> Result<RelyingPartyConfig, ConfigError> {
        RelyingPartyConfig::new(&self.rp_id, &self.rp_name, &self.rp_origins)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.socket_addr())
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_enabled", &self.rate_limit_enabled)
            .field("database", &self.database_url.as_ref().map(|_| "<configured>"))
            .field("rp_id", &self.rp_id)
            .field("rp_origins", &self.rp_origins)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("counter_policy", &self.counter_policy)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_ttl_secs", &self.jwt_ttl_secs)
            .finish()
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|value| split_list(&value))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(!config.rate_limit_enabled);
        assert!(config.database_url.is_none());
        assert_eq!(config.counter_policy, CounterPolicy::Lenient);
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn test_default_relying_party() {
        let rp = Config::default().relying_party().unwrap();
        assert_eq!(rp.rp_id(), "localhost");
        assert_eq!(rp.rp_name(), "School Portal");
        assert!(rp.accepts_origin("http://localhost:3000"));
    }

    #[test]
    fn test_invalid_rp_origin_rejected() {
        let config = Config {
            rp_origins: vec!["ftp://school.example".to_string()],
            ..Config::default()
        };
        assert!(config.relying_party().is_err());
    }

    #[test]
    fn test_split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(" https://a.example , ,https://b.example"),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config {
            jwt_secret: "super-secret".to_string(),
            database_url: Some("postgres://user:pw@db/app".to_string()),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("pw@db"));
    }
}
