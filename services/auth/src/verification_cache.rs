//! Short-lived cache of successful credential verifications
//!
//! Keys are SHA-256 digests of a per-process random salt, the username and the
//! password; the plaintext password is never kept. The cache is created empty
//! at startup, holds at most `capacity` entries, and every entry expires after
//! `ttl`. A zero TTL disables it.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::{env, models::UserId};

/// Verification cache configuration
#[derive(Debug, Clone)]
pub struct VerificationCacheConfig {
    /// How long a successful verification is remembered
    pub ttl: Duration,
    /// Maximum number of remembered verifications
    pub capacity: usize,
}

impl Default for VerificationCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::ZERO,
            capacity: 1024,
        }
    }
}

impl VerificationCacheConfig {
    /// # Environment Variables
    /// - `VERIFICATION_CACHE_TTL`: duration string (default: "0s", disabled)
    /// - `VERIFICATION_CACHE_CAPACITY`: maximum entries (default: 1024)
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ttl: env::duration("VERIFICATION_CACHE_TTL", "0s")?,
            capacity: env::number("VERIFICATION_CACHE_CAPACITY", 1024)?,
        })
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero() && self.capacity > 0
    }
}

#[derive(Debug)]
struct CacheEntry {
    user_id: UserId,
    inserted: Instant,
}

/// Verification cache
#[derive(Debug, Clone)]
pub struct VerificationCache {
    config: VerificationCacheConfig,
    salt: [u8; 32],
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl VerificationCache {
    /// Create an empty cache with a fresh random salt
    pub fn new(config: VerificationCacheConfig) -> Self {
        Self {
            config,
            salt: rand::random(),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    fn key(&self, username: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt);
        hasher.update(username.as_bytes());
        hasher.update([0u8]);
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// User id of a still-fresh successful verification of this pair
    pub async fn lookup(&self, username: &str, password: &str) -> Option<UserId> {
        if !self.is_enabled() {
            return None;
        }

        let key = self.key(username, password);
        let mut entries = self.entries.lock().await;

        match entries.get(&key) {
            Some(entry) if entry.inserted.elapsed() < self.config.ttl => Some(entry.user_id),
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Remember a successful verification
    pub async fn insert(&self, username: &str, password: &str, user_id: UserId) {
        if !self.is_enabled() {
            return;
        }

        let key = self.key(username, password);
        let mut entries = self.entries.lock().await;

        if entries.len() >= self.config.capacity && !entries.contains_key(&key) {
            let ttl = self.config.ttl;
            entries.retain(|_, entry| entry.inserted.elapsed() < ttl);
        }

        if entries.len() >= self.config.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                user_id,
                inserted: Instant::now(),
            },
        );
    }

    /// Drop every entry that resolves to `user_id`
    pub async fn purge_user(&self, user_id: UserId) {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.user_id != user_id);
        debug!(
            "Purged {} cached verifications for user {}",
            before - entries.len(),
            user_id
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl_secs: u64, capacity: usize) -> VerificationCache {
        VerificationCache::new(VerificationCacheConfig {
            ttl: Duration::from_secs(ttl_secs),
            capacity,
        })
    }

    #[tokio::test]
    async fn disabled_cache_remembers_nothing() {
        let cache = cache(0, 10);
        cache.insert("alice", "pw123", 1).await;

        assert!(cache.is_empty().await);
        assert_eq!(cache.lookup("alice", "pw123").await, None);
    }

    #[tokio::test]
    async fn hits_require_the_exact_pair() {
        let cache = cache(60, 10);
        cache.insert("alice", "pw123", 1).await;

        assert_eq!(cache.lookup("alice", "pw123").await, Some(1));
        assert_eq!(cache.lookup("alice", "pw1234").await, None);
        assert_eq!(cache.lookup("alic", "epw123").await, None);
    }

    #[tokio::test]
    async fn keys_do_not_contain_the_password() {
        let cache = cache(60, 10);
        let key = cache.key("alice", "pw123");

        assert_eq!(key.len(), 64);
        assert!(!key.contains("pw123"));
        assert_ne!(key, VerificationCache::new(cache.config.clone()).key("alice", "pw123"));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_the_ttl() {
        let cache = cache(30, 10);
        cache.insert("alice", "pw123", 1).await;

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.lookup("alice", "pw123").await, Some(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.lookup("alice", "pw123").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_evicts_the_oldest_entry() {
        let cache = cache(300, 2);
        cache.insert("a", "1", 1).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert("b", "2", 2).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert("c", "3", 3).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.lookup("a", "1").await, None);
        assert_eq!(cache.lookup("b", "2").await, Some(2));
        assert_eq!(cache.lookup("c", "3").await, Some(3));
    }

    #[tokio::test]
    async fn purge_removes_only_that_user() {
        let cache = cache(60, 10);
        cache.insert("alice", "pw123", 1).await;
        cache.insert("alice", "old-password", 1).await;
        cache.insert("bob", "hunter2", 2).await;

        cache.purge_user(1).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.lookup("bob", "hunter2").await, Some(2));
    }
}
