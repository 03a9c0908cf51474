//! Session management: sign-up, sign-in, refresh rotation and account removal
//!
//! A session moves through `Anonymous -> Authenticated -> AccessExpired ->
//! RefreshExpired`, with `Deleted` reachable from `Authenticated`. None of
//! these states is stored; they fall out of token expiry and of what the
//! credential store currently holds for the subject.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::{
    error::{AuthError, AuthResult},
    jwt::{self, JwtConfig, TokenClass, TokenCodec},
    models::{TokenPair, UserId},
    repositories::CredentialStore,
    validation::{validate_password, validate_username},
    verification_cache::{VerificationCache, VerificationCacheConfig},
};

/// Session manager shared by every request handler
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    access: TokenCodec,
    refresh: TokenCodec,
    cache: VerificationCache,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(
        store: Arc<dyn CredentialStore>,
        jwt_config: &JwtConfig,
        cache_config: VerificationCacheConfig,
    ) -> Result<Self> {
        jwt_config.validate()?;

        let access = TokenCodec::new(
            TokenClass::Access,
            &jwt_config.access_secret,
            &jwt_config.issuer,
            jwt_config.access_token_lifetime,
        )?;
        let refresh = TokenCodec::new(
            TokenClass::Refresh,
            &jwt_config.refresh_secret,
            &jwt_config.issuer,
            jwt_config.refresh_token_lifetime,
        )?;

        if cache_config.is_enabled() {
            info!(
                "Verification cache enabled (ttl {:?}, capacity {})",
                cache_config.ttl, cache_config.capacity
            );
        }

        Ok(Self {
            store,
            access,
            refresh,
            cache: VerificationCache::new(cache_config),
        })
    }

    pub fn access_token_lifetime(&self) -> Duration {
        self.access.lifetime()
    }

    pub fn refresh_token_lifetime(&self) -> Duration {
        self.refresh.lifetime()
    }

    fn issue_pair(&self, user_id: UserId) -> AuthResult<TokenPair> {
        let subject = user_id.to_string();
        Ok(TokenPair {
            access: self.access.issue(&subject)?,
            refresh: self.refresh.issue(&subject)?,
        })
    }

    /// Register a new account and open its first session
    ///
    /// If token issuance fails after the user row was written, the row stays;
    /// the caller can sign in with the same credentials.
    pub async fn sign_up(&self, username: &str, password: &str) -> AuthResult<TokenPair> {
        validate_username(username).map_err(AuthError::Validation)?;
        validate_password(password).map_err(AuthError::Validation)?;

        if self.store.username_exists(username).await? {
            warn!("Sign-up rejected, username taken: {}", username);
            return Err(AuthError::DuplicateUsername);
        }

        let user_id = self.store.create_user(username, password).await?;
        let tokens = self.issue_pair(user_id)?;
        self.store
            .update_refresh_token(user_id, &tokens.refresh)
            .await?;

        info!("User {} signed up as {}", user_id, username);
        Ok(tokens)
    }

    /// Check credentials and open a new session, superseding any earlier one
    pub async fn sign_in(&self, username: &str, password: &str) -> AuthResult<TokenPair> {
        let user_id = match self.cache.lookup(username, password).await {
            Some(user_id) => user_id,
            None => {
                let user_id = self
                    .store
                    .verify_credentials(username, password)
                    .await
                    .inspect_err(|_| info!("Sign-in failed for {}", username))?;
                self.cache.insert(username, password, user_id).await;
                user_id
            }
        };

        let tokens = self.issue_pair(user_id)?;
        self.store
            .update_refresh_token(user_id, &tokens.refresh)
            .await?;

        info!("User {} signed in", user_id);
        Ok(tokens)
    }

    /// Exchange the current refresh token for a brand-new pair
    ///
    /// The presented token must verify against the refresh secret, name an
    /// existing user, and still be the one stored for that user. The swap is a
    /// single compare-and-set, so of several concurrent refreshes presenting
    /// the same token exactly one wins.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let claims = self.refresh.verify(refresh_token)?;
        let user_id = parse_subject(jwt::subject_of(&claims)?)?;

        if !self.store.user_id_exists(user_id).await? {
            info!("Refresh for unknown user {}", user_id);
            return Err(AuthError::Unauthorized);
        }

        let tokens = self.issue_pair(user_id)?;
        let rotated = self
            .store
            .rotate_refresh_token(user_id, refresh_token, &tokens.refresh)
            .await?;

        if !rotated {
            warn!("Superseded refresh token presented for user {}", user_id);
            return Err(AuthError::Unauthorized);
        }

        info!("Rotated tokens for user {}", user_id);
        Ok(tokens)
    }

    /// Resolve an access token to the user it was issued for
    ///
    /// Also checks that the user still exists, so deleting an account cuts off
    /// its outstanding access tokens immediately.
    pub async fn validate_access(&self, access_token: &str) -> AuthResult<UserId> {
        let claims = self.access.verify(access_token)?;
        let user_id = parse_subject(jwt::subject_of(&claims)?)?;

        if !self.store.user_id_exists(user_id).await? {
            info!("Access token for unknown user {}", user_id);
            return Err(AuthError::Unauthorized);
        }

        Ok(user_id)
    }

    /// Username of an authenticated user
    pub async fn username(&self, user_id: UserId) -> AuthResult<String> {
        self.store
            .find_username(user_id)
            .await?
            .ok_or(AuthError::Unauthorized)
    }

    /// End the current session by forgetting its refresh token
    pub async fn sign_out(&self, user_id: UserId) -> AuthResult<()> {
        self.store.clear_refresh_token(user_id).await?;
        info!("User {} signed out", user_id);
        Ok(())
    }

    /// Remove an account
    pub async fn delete_user(&self, user_id: UserId) -> AuthResult<()> {
        self.store.delete_user(user_id).await?;
        self.cache.purge_user(user_id).await;
        info!("User {} deleted", user_id);
        Ok(())
    }
}

fn parse_subject(subject: &str) -> AuthResult<UserId> {
    subject.parse().map_err(|_| {
        warn!("Token subject is not a user id");
        AuthError::Unauthorized
    })
}
