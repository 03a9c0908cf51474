//! Argon2 password hashing
//!
//! Hashing and verification are CPU bound, so both run on tokio's blocking
//! pool instead of stalling a request worker.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use std::sync::OnceLock;

use crate::repositories::StoreError;

fn hash_blocking(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Hashing(e.to_string()))
}

fn verify_blocking(password: &str, hash: &str) -> Result<bool, StoreError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| StoreError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Stand-in hash verified when the username is unknown, so a miss costs as
/// much as a wrong password.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_blocking("lexicon-dummy-password").unwrap_or_default())
}

/// Hash a password with a fresh random salt
pub async fn hash_password(password: &str) -> Result<String, StoreError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .map_err(|e| StoreError::Hashing(e.to_string()))?
}

/// Verify a password against a stored PHC hash string
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, StoreError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || verify_blocking(&password, &hash))
        .await
        .map_err(|e| StoreError::Hashing(e.to_string()))?
}

/// Spend the same effort as a real verification and always fail
pub async fn verify_against_dummy(password: &str) {
    let password = password.to_owned();
    let _ = tokio::task::spawn_blocking(move || verify_blocking(&password, dummy_hash())).await;
}
