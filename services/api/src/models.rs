//! API models for request and response payloads

pub mod collection;
pub mod language;
pub mod rating;
pub mod translation;

pub use collection::{Collection, CollectionTranslation, CreateCollectionRequest, RemoveTranslationsRequest};
pub use language::Language;
pub use rating::{Rating, RatingRequest};
pub use translation::{CompletedTranslation, Translation, TranslationRequest};
