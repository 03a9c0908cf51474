//! JWT codec for session token generation and validation
//!
//! Access and refresh tokens share one claim shape and one issuance path; the
//! only differences between the two classes are the HMAC secret and the
//! lifetime a codec instance was built with. Which class a token belongs to is
//! decided by the codec that verifies it, never by anything inside the token.

use anyhow::{Result, anyhow};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::env;

/// Every token is signed with this algorithm; anything else is rejected.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS512;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC secret for access tokens
    pub access_secret: String,
    /// HMAC secret for refresh tokens
    pub refresh_secret: String,
    /// Value of the `iss` claim
    pub issuer: String,
    /// Access token lifetime (default: 15 minutes)
    pub access_token_lifetime: Duration,
    /// Refresh token lifetime (default: 30 days)
    pub refresh_token_lifetime: Duration,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_token_lifetime", &self.access_token_lifetime)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .finish()
    }
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_ACCESS_SECRET`: HMAC secret for access tokens
    /// - `JWT_REFRESH_SECRET`: HMAC secret for refresh tokens, must differ from the access secret
    /// - `JWT_ISSUER`: issuer claim (default: "lexicon-auth")
    /// - `JWT_ACCESS_TOKEN_LIFETIME`: duration string (default: "15m")
    /// - `JWT_REFRESH_TOKEN_LIFETIME`: duration string (default: "720h")
    pub fn from_env() -> Result<Self> {
        let config = JwtConfig {
            access_secret: env::required("JWT_ACCESS_SECRET")?,
            refresh_secret: env::required("JWT_REFRESH_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "lexicon-auth".to_string()),
            access_token_lifetime: env::duration("JWT_ACCESS_TOKEN_LIFETIME", "15m")?,
            refresh_token_lifetime: env::duration("JWT_REFRESH_TOKEN_LIFETIME", "720h")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would collapse the two token classes or
    /// issue tokens that are born expired.
    pub fn validate(&self) -> Result<()> {
        if self.access_secret == self.refresh_secret {
            return Err(anyhow!(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must be different"
            ));
        }
        if self.issuer.trim().is_empty() {
            return Err(anyhow!("JWT_ISSUER must not be empty"));
        }
        if self.access_token_lifetime.as_secs() == 0 || self.refresh_token_lifetime.as_secs() == 0
        {
            return Err(anyhow!("token lifetimes must be at least one second"));
        }
        Ok(())
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuing service
    pub iss: String,
    /// User ID, as a string
    #[serde(default)]
    pub sub: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Random token id so that two tokens minted in the same second differ
    pub jti: String,
}

/// Token class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenClass::Access => f.write_str("access"),
            TokenClass::Refresh => f.write_str("refresh"),
        }
    }
}

/// Token errors. The distinctions exist for logs only.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signature does not verify")]
    InvalidSignature,

    #[error("token uses an unexpected signing algorithm")]
    UnexpectedAlgorithm,

    #[error("token was issued by someone else")]
    InvalidIssuer,

    #[error("token is malformed")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token has no subject")]
    MissingSubject,

    #[error("failed to encode token: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnexpectedAlgorithm
            }
            ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Signs and verifies tokens of a single class
#[derive(Clone)]
pub struct TokenCodec {
    class: TokenClass,
    issuer: String,
    lifetime: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("class", &self.class)
            .field("issuer", &self.issuer)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec for one token class
    pub fn new(class: TokenClass, secret: &str, issuer: &str, lifetime: Duration) -> Result<Self> {
        if secret.is_empty() {
            return Err(anyhow!("{} token secret must not be empty", class));
        }

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // Expiry is checked by `is_expired` with a strict `exp > now` rule;
        // the library check tolerates `exp == now` and applies leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        Ok(TokenCodec {
            class,
            issuer: issuer.to_string(),
            lifetime,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// The class this codec signs and accepts
    pub fn class(&self) -> TokenClass {
        self.class
    }

    /// How long tokens minted by this codec stay valid
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for `subject`, valid for this codec's lifetime
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, unix_now()?)
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, subject: &str, now: u64) -> Result<String, TokenError> {
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(self.lifetime.as_secs()),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Check algorithm, signature and issuer, then decode the claims.
    /// Expiry is not checked here.
    pub fn parse_and_verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Full validation: signature plus expiry
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = self.parse_and_verify(token)?;
        if is_expired(&claims)? {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

/// Whether `claims` has expired at the current time
pub fn is_expired(claims: &Claims) -> Result<bool, TokenError> {
    Ok(is_expired_at(claims, unix_now()?))
}

/// A token is valid while `exp > now`; `exp == now` is already expired.
pub fn is_expired_at(claims: &Claims, now: u64) -> bool {
    claims.exp <= now
}

/// Extract the subject claim
pub fn subject_of(claims: &Claims) -> Result<&str, TokenError> {
    if claims.sub.is_empty() {
        return Err(TokenError::MissingSubject);
    }
    Ok(&claims.sub)
}

fn unix_now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| TokenError::Encoding(format!("system clock before unix epoch: {}", e)))
}
