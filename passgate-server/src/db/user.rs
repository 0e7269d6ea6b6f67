//! User directory backed by the `users` table
//!
//! Users are created by the administration system. The passkey service only
//! looks them up and flips `passkey_verified` after a registration.

use async_trait::async_trait;
use passgate_core::{Identity, IdentityDirectory, RegistryError};
use sqlx::{FromRow, PgPool};

/// Read access to `users` for the ceremonies
#[derive(Clone)]
pub struct PgIdentityDirectory {
    pool: PgPool,
}

impl PgIdentityDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityDirectory for PgIdentityDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, RegistryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, display_name, role, passkey_verified
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RegistryError::Backend(e.to_string()))?;

        Ok(row.map(Identity::from))
    }

    async fn mark_passkey_verified(&self, user_id: i64) -> Result<(), RegistryError> {
        sqlx::query("UPDATE users SET passkey_verified = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RegistryError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn check_health(&self) -> Result<(), RegistryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| RegistryError::Backend(e.to_string()))?;
        Ok(())
    }
}

impl std::fmt::Debug for PgIdentityDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgIdentityDirectory")
            .field("pool", &"<PgPool>")
            .finish()
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    display_name: Option<String>,
    role: String,
    passkey_verified: bool,
}

impl From<UserRow> for Identity {
    fn from(row: UserRow) -> Self {
        // Display name is optional in the directory; fall back to the login name
        let display_name = row
            .display_name
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| row.username.clone());
        Identity {
            user_id: row.id,
            username: row.username,
            display_name,
            role: row.role,
            passkey_verified: row.passkey_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_without_display_name() {
        let identity = Identity::from(UserRow {
            id: 3,
            username: "bob".to_string(),
            display_name: Some("  ".to_string()),
            role: "parent".to_string(),
            passkey_verified: true,
        });
        assert_eq!(identity.display_name, "bob");
        assert_eq!(identity.role, "parent");
        assert!(identity.passkey_verified);
    }
}
