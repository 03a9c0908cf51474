//! PostgreSQL-backed credential store

use async_trait::async_trait;
use common::error::is_unique_violation;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use super::{CredentialStore, StoreError};
use crate::{models::UserId, password};

/// User repository over the shared connection pool
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, username: &str, password: &str) -> Result<UserId, StoreError> {
        info!("Creating new user: {}", username);

        let password_hash = password::hash_password(password).await?;

        let row = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateUsername
            } else {
                StoreError::from(e)
            }
        })?;

        Ok(row.get("id"))
    }

    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserId, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, password_hash
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let hash: String = row.get("password_hash");
                if password::verify_password(password, &hash).await? {
                    Ok(row.get("id"))
                } else {
                    debug!("Password mismatch for user: {}", username);
                    Err(StoreError::InvalidCredentials)
                }
            }
            None => {
                password::verify_against_dummy(password).await;
                debug!("Unknown username: {}", username);
                Err(StoreError::InvalidCredentials)
            }
        }
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn user_id_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn find_username(&self, user_id: UserId) -> Result<Option<String>, StoreError> {
        let username: Option<String> =
            sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(username)
    }

    async fn update_refresh_token(&self, user_id: UserId, token: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(token)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: UserId,
        presented: &str,
        replacement: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $1, updated_at = NOW()
            WHERE id = $2 AND refresh_token = $3
            "#,
        )
        .bind(replacement)
        .bind(user_id)
        .bind(presented)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_refresh_token(&self, user_id: UserId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn delete_user(&self, user_id: UserId) -> Result<(), StoreError> {
        info!("Deleting user: {}", user_id);

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
