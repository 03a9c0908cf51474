//! Repositories for database operations

pub mod collection;
pub mod translation;

pub use collection::CollectionRepository;
pub use translation::TranslationRepository;
