//! Process-local credential store for development and tests

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::{CredentialStore, StoreError};
use crate::{
    models::{User, UserId},
    password,
};

#[derive(Default)]
struct Users {
    next_id: UserId,
    by_id: HashMap<UserId, User>,
}

impl Users {
    fn by_username(&self, username: &str) -> Option<&User> {
        self.by_id.values().find(|u| u.username == username)
    }
}

/// In-memory credential store; every operation takes the lock once, so each
/// write is atomic with respect to the others.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    users: Arc<RwLock<Users>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently stored refresh token, if any
    pub async fn refresh_token_of(&self, user_id: UserId) -> Option<String> {
        self.users
            .read()
            .await
            .by_id
            .get(&user_id)
            .and_then(|u| u.refresh_token.clone())
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.by_id.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, username: &str, password: &str) -> Result<UserId, StoreError> {
        info!("Creating new user: {}", username);

        let password_hash = password::hash_password(password).await?;

        let mut users = self.users.write().await;
        if users.by_username(username).is_some() {
            return Err(StoreError::DuplicateUsername);
        }

        users.next_id += 1;
        let id = users.next_id;
        let now = Utc::now();
        users.by_id.insert(
            id,
            User {
                id,
                username: username.to_string(),
                password_hash,
                refresh_token: None,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(id)
    }

    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserId, StoreError> {
        let found = {
            let users = self.users.read().await;
            users
                .by_username(username)
                .map(|u| (u.id, u.password_hash.clone()))
        };

        let Some((id, hash)) = found else {
            password::verify_against_dummy(password).await;
            return Err(StoreError::InvalidCredentials);
        };

        if password::verify_password(password, &hash).await? {
            Ok(id)
        } else {
            Err(StoreError::InvalidCredentials)
        }
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.users.read().await.by_username(username).is_some())
    }

    async fn user_id_exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        Ok(self.users.read().await.by_id.contains_key(&user_id))
    }

    async fn find_username(&self, user_id: UserId) -> Result<Option<String>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .by_id
            .get(&user_id)
            .map(|u| u.username.clone()))
    }

    async fn update_refresh_token(&self, user_id: UserId, token: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.by_id.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.refresh_token = Some(token.to_string());
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        user_id: UserId,
        presented: &str,
        replacement: &str,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        match users.by_id.get_mut(&user_id) {
            Some(user) if user.refresh_token.as_deref() == Some(presented) => {
                user.refresh_token = Some(replacement.to_string());
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_refresh_token(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let user = users.by_id.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        user.refresh_token = None;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_user(&self, user_id: UserId) -> Result<(), StoreError> {
        info!("Deleting user: {}", user_id);

        self.users
            .write()
            .await
            .by_id
            .remove(&user_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_usernames_are_rejected_without_a_write() {
        let store = MemoryCredentialStore::new();
        let id = store.create_user("alice", "pw123").await.unwrap();

        let again = store.create_user("alice", "other").await;
        assert!(matches!(again, Err(StoreError::DuplicateUsername)));
        assert_eq!(store.user_count().await, 1);
        assert_eq!(store.verify_credentials("alice", "pw123").await.unwrap(), id);
    }

    #[tokio::test]
    async fn usernames_are_case_sensitive() {
        let store = MemoryCredentialStore::new();
        store.create_user("alice", "pw123").await.unwrap();

        assert!(!store.username_exists("Alice").await.unwrap());
        assert!(store.create_user("Alice", "pw123").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_fail_the_same_way() {
        let store = MemoryCredentialStore::new();
        store.create_user("alice", "pw123").await.unwrap();

        let wrong_password = store.verify_credentials("alice", "nope").await;
        let unknown_user = store.verify_credentials("bob", "pw123").await;

        assert!(matches!(wrong_password, Err(StoreError::InvalidCredentials)));
        assert!(matches!(unknown_user, Err(StoreError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn rotation_only_replaces_the_current_token() {
        let store = MemoryCredentialStore::new();
        let id = store.create_user("alice", "pw123").await.unwrap();
        store.update_refresh_token(id, "r1").await.unwrap();

        assert!(!store.rotate_refresh_token(id, "stale", "r2").await.unwrap());
        assert!(store.rotate_refresh_token(id, "r1", "r2").await.unwrap());
        assert!(!store.rotate_refresh_token(id, "r1", "r3").await.unwrap());
        assert_eq!(store.refresh_token_of(id).await.as_deref(), Some("r2"));

        store.clear_refresh_token(id).await.unwrap();
        assert!(!store.rotate_refresh_token(id, "r2", "r3").await.unwrap());
    }

    #[tokio::test]
    async fn writes_to_missing_users_report_not_found() {
        let store = MemoryCredentialStore::new();

        assert!(matches!(
            store.update_refresh_token(99, "r").await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(store.delete_user(99).await, Err(StoreError::NotFound)));
        assert!(!store.rotate_refresh_token(99, "a", "b").await.unwrap());
    }

    #[tokio::test]
    async fn deleted_users_disappear() {
        let store = MemoryCredentialStore::new();
        let id = store.create_user("alice", "pw123").await.unwrap();

        store.delete_user(id).await.unwrap();

        assert!(!store.user_id_exists(id).await.unwrap());
        assert!(!store.username_exists("alice").await.unwrap());
        assert_eq!(store.find_username(id).await.unwrap(), None);
    }
}
