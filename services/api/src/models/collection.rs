//! Collections of saved translations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::translation::Translation;

pub const MAX_COLLECTION_NAME_LENGTH: usize = 100;

/// A named set of translations owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
}

/// A translation's membership in a collection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionTranslation {
    pub id: i64,
    pub collection: Collection,
    pub translation: Translation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub name: String,
}

impl CreateCollectionRequest {
    /// Trimmed name, or a message explaining why it is unacceptable
    pub fn validated_name(&self) -> Result<String, String> {
        let name = self.name.trim();

        if name.is_empty() {
            return Err("Collection name is required".to_string());
        }

        if name.chars().count() > MAX_COLLECTION_NAME_LENGTH {
            return Err(format!(
                "Collection name must be at most {} characters long",
                MAX_COLLECTION_NAME_LENGTH
            ));
        }

        Ok(name.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveTranslationsRequest {
    pub translation_ids: Vec<i64>,
}
