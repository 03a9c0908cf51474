//! Chat-completion client used to produce new translations

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    error::ApiError,
    models::{CompletedTranslation, Language},
};

const DEFAULT_COMPLETION_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Completion endpoint configuration
#[derive(Clone)]
pub struct CompletionConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl CompletionConfig {
    /// # Environment Variables
    /// - `COMPLETION_API_URL`: chat-completions endpoint (default: OpenAI)
    /// - `COMPLETION_API_KEY`: bearer key for the endpoint (required)
    /// - `COMPLETION_MODEL`: model name (default: gpt-4o-mini)
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_url: auth::env::string("COMPLETION_API_URL", DEFAULT_COMPLETION_API_URL),
            api_key: auth::env::required("COMPLETION_API_KEY")?,
            model: auth::env::string("COMPLETION_MODEL", DEFAULT_COMPLETION_MODEL),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the chat-completions endpoint
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, config })
    }

    /// Ask the model to translate one lexical item
    pub async fn translate(
        &self,
        lexical_item: &str,
        from: Language,
        to: Language,
    ) -> Result<CompletedTranslation, ApiError> {
        let prompt = translation_prompt(lexical_item, from, to);
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        info!("Requesting {} -> {} translation of {:?}", from, to, lexical_item);

        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream(format!(
                "completion endpoint returned {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Upstream(format!("failed to read response: {}", e)))?;

        parse_completion(&body)
    }
}

/// Prompt asking for a single JSON object describing the translation
pub fn translation_prompt(lexical_item: &str, from: Language, to: Language) -> String {
    format!(
        "Translate the {from} lexical item below into {to}. Respond with a single JSON object \
         with exactly these fields: \
         originalMeaning (string, the meaning in {from}), \
         originalExamples (array of 2 strings, example sentences in {from}), \
         translatedLexicalItem (string, the translation in {to}), \
         translatedMeaning (string, the meaning in {to}), \
         translatedExamples (array of 2 strings, example sentences in {to}). \
         Lexical item: {item}",
        from = from,
        to = to,
        item = lexical_item,
    )
}

/// Extract the translation from a chat-completions response body
///
/// Exactly one choice is expected and its content must be a complete
/// translation object.
pub fn parse_completion(body: &str) -> Result<CompletedTranslation, ApiError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ApiError::Upstream(format!("unreadable completion response: {}", e)))?;

    let [choice] = <[Choice; 1]>::try_from(response.choices).map_err(|choices| {
        ApiError::Upstream(format!("expected 1 choice, got {}", choices.len()))
    })?;

    let content = choice
        .message
        .content
        .ok_or_else(|| ApiError::Upstream("completion has no content".to_string()))?;

    let completed: CompletedTranslation = serde_json::from_str(&content).map_err(|e| {
        ApiError::Upstream(format!("completion is not a translation object: {}: {}", e, content))
    })?;

    if !completed.is_complete() {
        debug!("Incomplete completion: {:?}", completed);
        return Err(ApiError::Upstream("completion is missing fields".to_string()));
    }

    Ok(completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response_with(contents: &[serde_json::Value]) -> String {
        let choices: Vec<_> = contents
            .iter()
            .map(|content| json!({"message": {"role": "assistant", "content": content.to_string()}}))
            .collect();
        json!({"choices": choices}).to_string()
    }

    fn translation_json() -> serde_json::Value {
        json!({
            "originalMeaning": "a small domesticated feline",
            "originalExamples": ["The cat sleeps.", "I fed the cat."],
            "translatedLexicalItem": "Katze",
            "translatedMeaning": "ein kleines Haustier",
            "translatedExamples": ["Die Katze schläft.", "Ich habe die Katze gefüttert."]
        })
    }

    #[test]
    fn prompt_names_languages_and_item() {
        let prompt = translation_prompt("cat", Language::English, Language::German);
        assert!(prompt.contains("english"));
        assert!(prompt.contains("german"));
        assert!(prompt.ends_with("Lexical item: cat"));
        assert!(prompt.contains("translatedExamples"));
    }

    #[test]
    fn request_body_asks_for_json() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: [ChatMessage {
                role: "user",
                content: "hello",
            }],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn parses_a_single_complete_choice() {
        let completed = parse_completion(&response_with(&[translation_json()])).unwrap();
        assert_eq!(completed.translated_lexical_item, "Katze");
        assert_eq!(completed.original_examples.len(), 2);
    }

    #[test]
    fn choice_count_must_be_one() {
        assert!(matches!(
            parse_completion(&response_with(&[])),
            Err(ApiError::Upstream(_))
        ));
        assert!(matches!(
            parse_completion(&response_with(&[translation_json(), translation_json()])),
            Err(ApiError::Upstream(_))
        ));
    }

    #[test]
    fn incomplete_or_garbled_content_is_an_upstream_error() {
        let mut partial = translation_json();
        partial["translatedExamples"] = json!([]);
        assert!(matches!(
            parse_completion(&response_with(&[partial])),
            Err(ApiError::Upstream(_))
        ));

        let garbled = json!({"choices": [{"message": {"content": "not json at all"}}]}).to_string();
        assert!(matches!(parse_completion(&garbled), Err(ApiError::Upstream(_))));

        assert!(matches!(parse_completion("<html>"), Err(ApiError::Upstream(_))));
    }

    #[test]
    fn config_debug_hides_the_key() {
        let config = CompletionConfig {
            api_url: "https://example.invalid/v1/chat/completions".into(),
            api_key: "sk-secret".into(),
            model: DEFAULT_COMPLETION_MODEL.into(),
        };
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
