//! Minimal Gemini client used by the game generator.
//!
//! Only `generateContent` with a single user turn is used. The API key is sent as a
//! header and never logged.

use futures::future::BoxFuture;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::GeneratorConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Failure of a text generation call.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to the model failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("model returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("model returned no text")]
    Empty,
}

/// Produces raw text for a prompt. Implemented by the Gemini client and by test doubles.
pub trait ContentGenerator: Send + Sync {
    fn generate(&self, prompt: String) -> BoxFuture<'static, Result<String, GeneratorError>>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Build the client when an API key is configured; `Ok(None)` otherwise.
    pub fn from_config(config: &GeneratorConfig) -> Result<Option<Self>, GeneratorError> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(GeneratorError::Client)?;

        Ok(Some(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
        }))
    }

    #[instrument(level = "info", skip(self, prompt), fields(model = %self.model))]
    async fn generate_content(&self, prompt: String) -> Result<String, GeneratorError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part { text: Some(prompt) }],
            }],
        };

        let res = self
            .client
            .post(&url)
            .header(USER_AGENT, "jeopardy-back/0.1")
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(GeneratorError::Transport)?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            let message = extract_error_message(&body).unwrap_or(body);
            return Err(GeneratorError::Http { status, message });
        }

        let body: GenerateContentResponse = res.json().await.map_err(GeneratorError::Transport)?;
        let text = body.text();
        if text.trim().is_empty() {
            return Err(GeneratorError::Empty);
        }
        info!(chars = text.len(), "model response received");
        Ok(text)
    }
}

impl ContentGenerator for GeminiClient {
    fn generate(&self, prompt: String) -> BoxFuture<'static, Result<String, GeneratorError>> {
        let client = self.clone();
        Box::pin(async move { client.generate_content(prompt).await })
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text(), "{\"a\":1}");
    }

    #[test]
    fn missing_candidates_yield_empty_text() {
        let body: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(body.text().is_empty());
    }

    #[test]
    fn error_message_is_extracted() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("API key not valid")
        );
        assert!(extract_error_message("plain text").is_none());
    }

    #[test]
    fn client_is_absent_without_key() {
        let config = crate::config::AppConfig::default().generator;
        assert!(GeminiClient::from_config(&config).unwrap().is_none());
    }
}
