//! Credential store: durable users, password hashes and refresh-token state

use async_trait::async_trait;
use common::error::DatabaseError;
use thiserror::Error;

use crate::models::UserId;

pub mod memory;
pub mod user;

pub use memory::MemoryCredentialStore;
pub use user::PgCredentialStore;

/// Credential store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already exists")]
    DuplicateUsername,

    /// Unknown username and wrong password are deliberately the same error
    #[error("authentication failed")]
    InvalidCredentials,

    #[error("user not found")]
    NotFound,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(DatabaseError::Query(err))
    }
}

/// Persistence contract the session manager relies on
///
/// Implementations must be safe to share between concurrent requests. Every
/// mutating operation is a single atomic write.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Hash `password` and insert a new user, returning its id
    async fn create_user(&self, username: &str, password: &str) -> Result<UserId, StoreError>;

    /// Check a username/password pair and return the matching user id
    async fn verify_credentials(&self, username: &str, password: &str)
    -> Result<UserId, StoreError>;

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError>;

    async fn user_id_exists(&self, user_id: UserId) -> Result<bool, StoreError>;

    async fn find_username(&self, user_id: UserId) -> Result<Option<String>, StoreError>;

    /// Unconditionally replace the stored refresh token
    async fn update_refresh_token(&self, user_id: UserId, token: &str) -> Result<(), StoreError>;

    /// Replace the stored refresh token only if it still equals `presented`.
    /// Returns false when the presented token has already been superseded or
    /// the user is gone.
    async fn rotate_refresh_token(
        &self,
        user_id: UserId,
        presented: &str,
        replacement: &str,
    ) -> Result<bool, StoreError>;

    /// Forget the stored refresh token
    async fn clear_refresh_token(&self, user_id: UserId) -> Result<(), StoreError>;

    async fn delete_user(&self, user_id: UserId) -> Result<(), StoreError>;
}
