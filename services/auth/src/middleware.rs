//! Access guard: bearer-token validation for protected route groups
//!
//! The guard knows nothing about paths. Routers attach it with `route_layer`
//! to the groups that need it; public routes simply never see it.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{error::AuthError, models::UserId, session::SessionManager};

const BEARER_PREFIX: &str = "Bearer ";

/// The user an access token was resolved to, placed in request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
}

/// Extract the bearer credential from the Authorization header
///
/// The `Bearer ` prefix is matched case-sensitively; the remainder is trimmed
/// and must not be empty.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

/// Reject the request unless it carries a valid access token
pub async fn require_access(
    State(sessions): State<SessionManager>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = match bearer_token(req.headers()) {
        Some(token) => token.to_owned(),
        None => {
            debug!("Missing or malformed Authorization header");
            return Err(AuthError::Unauthorized);
        }
    };

    let user_id = sessions.validate_access(&token).await?;

    // Add user ID to request extensions for use in handlers
    req.extensions_mut().insert(AuthenticatedUser { id: user_id });

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AuthError::Unauthorized)
    }
}
