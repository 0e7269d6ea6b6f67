//! Database module for Passgate Server
//!
//! PostgreSQL implementations of the core storage traits, plus backend
//! selection:
//! - **Credentials** and **users** live in PostgreSQL when `DATABASE_URL` is set.
//! - Otherwise both fall back to in-memory stores (useful for development,
//!   but credentials are lost on restart). `DEV_USERS` seeds the in-memory
//!   user directory.
//!
//! Challenge sessions never touch the database; they are owned by the
//! ceremonies.

pub mod credential;
pub mod user;

pub use credential::PgCredentialRegistry;
pub use user::PgIdentityDirectory;

use std::sync::Arc;

use passgate_core::{
    CredentialRegistry, Identity, IdentityDirectory, MemoryCredentialRegistry,
    MemoryIdentityDirectory,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;

/// Database setup errors
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database migration error: {0}")]
    Migration(String),
}

/// Open the connection pool using the configured pool bounds.
pub async fn connect(database_url: &str, config: &Config) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .connect(database_url)
        .await
        .map_err(|e| DbError::Connection(e.to_string()))?;

    tracing::info!(
        max_connections = config.database_max_connections,
        "Connected to PostgreSQL database"
    );
    Ok(pool)
}

/// Run database migrations
pub async fn migrate(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Storage backends handed to the ceremonies and handlers
#[derive(Clone)]
pub struct Backends {
    pub registry: Arc<dyn CredentialRegistry>,
    pub directory: Arc<dyn IdentityDirectory>,
}

impl Backends {
    /// PostgreSQL backends sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            registry: Arc::new(PgCredentialRegistry::new(pool.clone())),
            directory: Arc::new(PgIdentityDirectory::new(pool)),
        }
    }

    /// In-memory backends with the given identities (development only)
    pub fn in_memory(identities: Vec<Identity>) -> Self {
        let directory = MemoryIdentityDirectory::new();
        for identity in identities {
            directory.insert(identity);
        }
        Self {
            registry: Arc::new(MemoryCredentialRegistry::new()),
            directory: Arc::new(directory),
        }
    }

    /// Create backends from configuration
    ///
    /// Uses PostgreSQL if `DATABASE_URL` is set, otherwise falls back to in-memory.
    pub async fn from_config(config: &Config) -> Result<Self, DbError> {
        match &config.database_url {
            Some(url) => {
                tracing::info!("Using PostgreSQL credential storage");
                let pool = connect(url, config).await?;
                migrate(&pool).await?;
                Ok(Self::postgres(pool))
            }
            None => {
                let identities = std::env::var("DEV_USERS")
                    .map(|spec| parse_dev_users(&spec))
                    .unwrap_or_default();
                tracing::warn!(
                    seeded_users = identities.len(),
                    "DATABASE_URL not set, using in-memory storage - credentials will be lost on restart!"
                );
                Ok(Self::in_memory(identities))
            }
        }
    }
}

/// Parse `username[:display name[:role]]` entries separated by commas.
///
/// User ids are assigned from 1 in order. Entries with an empty username are
/// skipped.
pub fn parse_dev_users(spec: &str) -> Vec<Identity> {
    spec.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let mut fields = entry.splitn(3, ':').map(str::trim);
            let username = fields.next().filter(|u| !u.is_empty())?;
            let display_name = fields.next().filter(|d| !d.is_empty()).unwrap_or(username);
            let role = fields.next().filter(|r| !r.is_empty()).unwrap_or("user");
            Some((username, display_name, role))
        })
        .zip(1i64..)
        .map(|((username, display_name, role), id)| {
            Identity::new(id, username, display_name, role)
        })
        .collect()
}
