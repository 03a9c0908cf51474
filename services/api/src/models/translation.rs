//! Translation payloads and their text export

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt::Write;

/// Request body for `POST /translations`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub lexical_item: String,
    pub translate_from: String,
    pub translate_to: String,
    #[serde(default)]
    pub saving_enabled: bool,
    #[serde(rename = "collectionID", default)]
    pub collection_id: Option<i64>,
}

/// A stored translation
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub id: i64,
    pub original_lexical_item: String,
    pub original_meaning: String,
    pub original_examples: Vec<String>,
    pub translated_from: String,
    pub translated_to: String,
    pub translated_lexical_item: String,
    pub translated_meaning: String,
    pub translated_examples: Vec<String>,
}

/// The JSON object the completion endpoint is asked to produce
///
/// Every field defaults to empty so that a partial answer parses and is then
/// rejected by [`CompletedTranslation::is_complete`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletedTranslation {
    pub original_meaning: String,
    pub original_examples: Vec<String>,
    pub translated_lexical_item: String,
    pub translated_meaning: String,
    pub translated_examples: Vec<String>,
}

impl CompletedTranslation {
    pub fn is_complete(&self) -> bool {
        let filled = |s: &String| !s.trim().is_empty();

        filled(&self.original_meaning)
            && filled(&self.translated_lexical_item)
            && filled(&self.translated_meaning)
            && !self.original_examples.is_empty()
            && self.original_examples.iter().all(filled)
            && !self.translated_examples.is_empty()
            && self.translated_examples.iter().all(filled)
    }
}

/// Lexical items are stored lower-cased and trimmed
pub fn normalize_lexical_item(item: &str) -> String {
    item.trim().to_lowercase()
}

/// Collapse every whitespace run, newlines included, into one space
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render translations in the `term;definition` flashcard import format
///
/// Each block starts with the term, a `;`, then the multi-line definition, and
/// blocks are separated by a blank line. Every field is flattened to a single
/// line so model output cannot open a new block, and `;` in the term becomes
/// `,` because the first `;` separates term from definition.
pub fn export_term_definitions(translations: &[Translation]) -> String {
    let mut out = String::new();

    for t in translations {
        let term = single_line(&t.original_lexical_item).replace(';', ",");
        let _ = writeln!(out, "{};originalMeaning: {}", term, single_line(&t.original_meaning));
        out.push_str("originalExamples:\n");
        for (i, example) in t.original_examples.iter().enumerate() {
            let _ = writeln!(out, "{}) {}", i + 1, single_line(example));
        }
        let _ = writeln!(out, "translatedLexicalItem: {}", single_line(&t.translated_lexical_item));
        let _ = writeln!(out, "translatedMeaning: {}", single_line(&t.translated_meaning));
        out.push_str("translatedExamples:\n");
        for (i, example) in t.translated_examples.iter().enumerate() {
            let _ = writeln!(out, "{}) {}", i + 1, single_line(example));
        }
        out.push('\n');
    }

    out
}
