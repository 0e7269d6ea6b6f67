//! PostgreSQL credential registry
//!
//! Persists passkeys in `passkey_credentials`. Sign counters are stored as
//! BIGINT; the compare-and-set update is a single conditional `UPDATE`, so two
//! concurrent logins cannot both advance the same counter value.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use passgate_core::{Credential, CredentialId, CredentialRegistry, RegistryError};
use sqlx::{FromRow, PgPool};

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed credential registry
#[derive(Clone)]
pub struct PgCredentialRegistry {
    pool: PgPool,
}

impl PgCredentialRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialRegistry for PgCredentialRegistry {
    async fn insert(&self, credential: Credential) -> Result<(), RegistryError> {
        let sign_count = to_db_count(credential.sign_count)?;

        let result = sqlx::query(
            r#"
            INSERT INTO passkey_credentials
                (credential_id, user_id, public_key, sign_count, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(credential.credential_id.as_bytes())
        .bind(credential.user_id)
        .bind(&credential.public_key)
        .bind(sign_count)
        .bind(credential.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::info!(
                    credential_id = %credential.credential_id,
                    user_id = credential.user_id,
                    "Credential stored in database"
                );
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(RegistryError::Duplicate(credential.credential_id))
            }
            Err(e) => Err(backend(e)),
        }
    }

    async fn find(
        &self,
        credential_id: &CredentialId,
    ) -> Result<Option<Credential>, RegistryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT credential_id, user_id, public_key, sign_count, created_at, last_used_at
            FROM passkey_credentials
            WHERE credential_id = $1
            "#,
        )
        .bind(credential_id.as_bytes())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Credential::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Credential>, RegistryError> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT credential_id, user_id, public_key, sign_count, created_at, last_used_at
            FROM passkey_credentials
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(Credential::try_from).collect()
    }

    async fn has_credentials(&self, user_id: i64) -> Result<bool, RegistryError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM passkey_credentials WHERE user_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)
    }

    async fn compare_and_set_sign_count(
        &self,
        credential_id: &CredentialId,
        expected: u64,
        new_count: u64,
    ) -> Result<bool, RegistryError> {
        let result = sqlx::query(
            r#"
            UPDATE passkey_credentials
            SET sign_count = $3, last_used_at = NOW()
            WHERE credential_id = $1 AND sign_count = $2
            "#,
        )
        .bind(credential_id.as_bytes())
        .bind(to_db_count(expected)?)
        .bind(to_db_count(new_count)?)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected() == 1)
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passkey_credentials")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        Ok(count as usize)
    }

    async fn check_health(&self) -> Result<(), RegistryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for PgCredentialRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgCredentialRegistry")
            .field("pool", &"<PgPool>")
            .finish()
    }
}

fn backend(e: sqlx::Error) -> RegistryError {
    RegistryError::Backend(e.to_string())
}

/// Counters above `i64::MAX` cannot be stored in a BIGINT column.
fn to_db_count(count: u64) -> Result<i64, RegistryError> {
    i64::try_from(count)
        .map_err(|_| RegistryError::Backend(format!("sign counter {} out of range", count)))
}

/// Database row for credentials
#[derive(FromRow)]
struct CredentialRow {
    credential_id: Vec<u8>,
    user_id: i64,
    public_key: Vec<u8>,
    sign_count: i64,
    created_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
}

impl TryFrom<CredentialRow> for Credential {
    type Error = RegistryError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        let sign_count = u64::try_from(row.sign_count).map_err(|_| {
            RegistryError::Backend(format!("negative sign counter {} in database", row.sign_count))
        })?;

        Ok(Credential {
            credential_id: CredentialId::new(row.credential_id),
            user_id: row.user_id,
            public_key: row.public_key,
            sign_count,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
        })
    }
}
