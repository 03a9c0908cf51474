//! Translation repository for database operations

use common::error::DatabaseResult;
use sqlx::PgPool;

use crate::models::{CompletedTranslation, Language, Translation};

const TRANSLATION_COLUMNS: &str = r#"
    id,
    lexical_item AS original_lexical_item,
    meaning AS original_meaning,
    examples AS original_examples,
    translated_from,
    translated_to,
    translated_lexical_item,
    translated_meaning,
    translated_examples
"#;

/// Translation repository for database operations
#[derive(Clone)]
pub struct TranslationRepository {
    pool: PgPool,
}

impl TranslationRepository {
    /// Create a new translation repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the stored translation of a normalized lexical item
    pub async fn find(
        &self,
        lexical_item: &str,
        from: Language,
        to: Language,
    ) -> DatabaseResult<Option<Translation>> {
        let query = format!(
            "SELECT {} FROM translations
             WHERE lexical_item = $1 AND translated_from = $2 AND translated_to = $3",
            TRANSLATION_COLUMNS
        );

        let translation = sqlx::query_as::<_, Translation>(&query)
            .bind(lexical_item)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(translation)
    }

    /// Store a completed translation, replacing any earlier one for the same key
    pub async fn upsert(
        &self,
        lexical_item: &str,
        from: Language,
        to: Language,
        completed: &CompletedTranslation,
    ) -> DatabaseResult<Translation> {
        let query = format!(
            r#"
            INSERT INTO translations (
                lexical_item, meaning, examples, translated_from, translated_to,
                translated_lexical_item, translated_meaning, translated_examples
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (lexical_item, translated_from, translated_to) DO UPDATE SET
                meaning = EXCLUDED.meaning,
                examples = EXCLUDED.examples,
                translated_lexical_item = EXCLUDED.translated_lexical_item,
                translated_meaning = EXCLUDED.translated_meaning,
                translated_examples = EXCLUDED.translated_examples
            RETURNING {}
            "#,
            TRANSLATION_COLUMNS
        );

        let translation = sqlx::query_as::<_, Translation>(&query)
            .bind(lexical_item)
            .bind(&completed.original_meaning)
            .bind(&completed.original_examples)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(&completed.translated_lexical_item)
            .bind(&completed.translated_meaning)
            .bind(&completed.translated_examples)
            .fetch_one(&self.pool)
            .await?;

        Ok(translation)
    }
}
