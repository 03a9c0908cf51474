//! Custom error types for the common library
//!
//! This module defines the database error type shared by every service that
//! talks to PostgreSQL.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred while applying schema migrations
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::Query(err)
    }
}

impl DatabaseError {
    /// Whether the underlying driver error is a unique-constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DatabaseError::Connection(e) | DatabaseError::Query(e) => is_unique_violation(e),
            _ => false,
        }
    }
}

/// Whether a raw sqlx error was raised by a UNIQUE constraint
pub fn is_unique_violation(err: &SqlxError) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
