//! Collection repository for database operations
//!
//! Every query that touches a collection's contents is scoped by the owning
//! user, so a foreign collection id behaves exactly like a missing one.

use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::models::{Collection, CollectionTranslation, Translation};

/// Collection repository for database operations
#[derive(Clone)]
pub struct CollectionRepository {
    pool: PgPool,
}

impl CollectionRepository {
    /// Create a new collection repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a collection for a user
    pub async fn create(&self, user_id: i64, name: &str) -> DatabaseResult<Collection> {
        let collection = sqlx::query_as::<_, Collection>(
            r#"
            INSERT INTO collections (user_id, collection_name)
            VALUES ($1, $2)
            RETURNING id, collection_name AS name, user_id
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(collection)
    }

    /// All collections owned by a user
    pub async fn list_for_user(&self, user_id: i64) -> DatabaseResult<Vec<Collection>> {
        let collections = sqlx::query_as::<_, Collection>(
            r#"
            SELECT id, collection_name AS name, user_id
            FROM collections
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(collections)
    }

    /// Find a collection if, and only if, it belongs to `user_id`
    pub async fn find_owned(
        &self,
        collection_id: i64,
        user_id: i64,
    ) -> DatabaseResult<Option<Collection>> {
        let collection = sqlx::query_as::<_, Collection>(
            r#"
            SELECT id, collection_name AS name, user_id
            FROM collections
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(collection_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(collection)
    }

    /// Attach a translation to a collection; attaching twice is a no-op
    pub async fn attach(&self, collection_id: i64, translation_id: i64) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO collection_translations (collection_id, translation_id)
            VALUES ($1, $2)
            ON CONFLICT (collection_id, translation_id) DO NOTHING
            "#,
        )
        .bind(collection_id)
        .bind(translation_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Translations in an owned collection
    ///
    /// With `due_only`, only entries never reviewed or due at or before `now`.
    pub async fn translations(
        &self,
        collection_id: i64,
        user_id: i64,
        due_only: bool,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Vec<CollectionTranslation>> {
        let rows = sqlx::query(
            r#"
            SELECT
                ct.id AS entry_id,
                ct.due,
                c.id AS collection_id,
                c.collection_name,
                c.user_id,
                t.id AS translation_id,
                t.lexical_item,
                t.meaning,
                t.examples,
                t.translated_from,
                t.translated_to,
                t.translated_lexical_item,
                t.translated_meaning,
                t.translated_examples
            FROM collection_translations ct
            JOIN collections c ON ct.collection_id = c.id
            JOIN translations t ON ct.translation_id = t.id
            WHERE c.id = $1
              AND c.user_id = $2
              AND (NOT $3 OR ct.due IS NULL OR ct.due <= $4)
            ORDER BY ct.id
            "#,
        )
        .bind(collection_id)
        .bind(user_id)
        .bind(due_only)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(collection_translation).collect())
    }

    /// Remove translations from an owned collection, returning how many went
    pub async fn remove_translations(
        &self,
        collection_id: i64,
        user_id: i64,
        translation_ids: &[i64],
    ) -> DatabaseResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM collection_translations
            WHERE translation_id = ANY($1)
              AND collection_id = (
                  SELECT id FROM collections WHERE id = $2 AND user_id = $3
              )
            "#,
        )
        .bind(translation_ids)
        .bind(collection_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Record the next review time; false when the entry does not exist for this owner
    pub async fn set_due(
        &self,
        collection_id: i64,
        user_id: i64,
        translation_id: i64,
        due: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE collection_translations
            SET due = $4
            WHERE translation_id = $3
              AND collection_id = (
                  SELECT id FROM collections WHERE id = $1 AND user_id = $2
              )
            "#,
        )
        .bind(collection_id)
        .bind(user_id)
        .bind(translation_id)
        .bind(due)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn collection_translation(row: &PgRow) -> CollectionTranslation {
    CollectionTranslation {
        id: row.get("entry_id"),
        collection: Collection {
            id: row.get("collection_id"),
            name: row.get("collection_name"),
            user_id: row.get("user_id"),
        },
        translation: Translation {
            id: row.get("translation_id"),
            original_lexical_item: row.get("lexical_item"),
            original_meaning: row.get("meaning"),
            original_examples: row.get("examples"),
            translated_from: row.get("translated_from"),
            translated_to: row.get("translated_to"),
            translated_lexical_item: row.get("translated_lexical_item"),
            translated_meaning: row.get("translated_meaning"),
            translated_examples: row.get("translated_examples"),
        },
        due: row.get("due"),
    }
}
