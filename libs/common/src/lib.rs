//! Common library for the Lexicon services
//!
//! This crate provides shared functionality used by the auth and translation
//! services, including database connectivity, schema migrations and error
//! handling.

pub mod database;
pub mod error;
