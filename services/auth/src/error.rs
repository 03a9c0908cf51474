//! Externally visible authentication errors
//!
//! Everything that means "you are not who you claim to be" collapses into
//! `Unauthorized` with one fixed body. Internal failures are logged where they
//! are converted and leave the service as a generic 500.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use crate::{jwt::TokenError, repositories::StoreError};

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or unacceptable request payload
    #[error("{0}")]
    Validation(String),

    #[error("username already exists")]
    DuplicateUsername,

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal server error")]
    Internal,
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => AuthError::DuplicateUsername,
            StoreError::InvalidCredentials => AuthError::Unauthorized,
            StoreError::NotFound => {
                error!("User record vanished between check and write");
                AuthError::Internal
            }
            StoreError::Hashing(e) => {
                error!("Password hashing failed: {}", e);
                AuthError::Internal
            }
            StoreError::Database(e) => {
                error!("Credential store failure: {}", e);
                AuthError::Internal
            }
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(e) => {
                error!("Failed to issue token: {}", e);
                AuthError::Internal
            }
            other => {
                debug!("Rejected token: {}", other);
                AuthError::Unauthorized
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthError::DuplicateUsername => {
                (StatusCode::CONFLICT, "Username already exists".to_string())
            }
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for auth results
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::error::DatabaseError;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let cases = [
            (AuthError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AuthError::DuplicateUsername, StatusCode::CONFLICT),
            (AuthError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AuthError::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn token_failures_are_indistinguishable() {
        for err in [
            TokenError::InvalidSignature,
            TokenError::Expired,
            TokenError::Malformed,
            TokenError::UnexpectedAlgorithm,
            TokenError::InvalidIssuer,
            TokenError::MissingSubject,
        ] {
            assert!(matches!(AuthError::from(err), AuthError::Unauthorized));
        }
    }

    #[test]
    fn store_failures_map_to_outcomes() {
        assert!(matches!(
            AuthError::from(StoreError::InvalidCredentials),
            AuthError::Unauthorized
        ));
        assert!(matches!(
            AuthError::from(StoreError::DuplicateUsername),
            AuthError::DuplicateUsername
        ));
        assert!(matches!(
            AuthError::from(StoreError::NotFound),
            AuthError::Internal
        ));
        assert!(matches!(
            AuthError::from(StoreError::Database(DatabaseError::Migration("x".into()))),
            AuthError::Internal
        ));
    }
}
