//! Lexicon authentication: credential storage, token issuance and the access
//! guard shared with the other services.

pub mod env;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod validation;
pub mod verification_cache;

use crate::{routes::CookieConfig, session::SessionManager};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub cookies: CookieConfig,
}
