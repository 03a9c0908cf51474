//! Authentication service models

pub mod user;

// Re-export for convenience
pub use user::{AuthCredentials, TokenPair, User, UserId};
