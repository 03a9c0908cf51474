//! Application state shared across handlers

use auth::session::SessionManager;

use crate::{
    llm::CompletionClient,
    repositories::{CollectionRepository, TranslationRepository},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub translation_repository: TranslationRepository,
    pub collection_repository: CollectionRepository,
    pub completions: CompletionClient,
}
