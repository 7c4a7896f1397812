//! OpenAI-backed extractor — one chat-completions call per item.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ExtractError;
use crate::extract::{EXTRACTION_PROMPT, Extractor, parse_extraction};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Max tokens for the extraction call.
const EXTRACTION_MAX_TOKENS: u32 = 2048;

/// Temperature for extraction (deterministic-ish).
const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// Extractor over the OpenAI chat-completions API.
pub struct OpenAiExtractor {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl OpenAiExtractor {
    pub fn new(api_key: SecretString, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

/// Chat-completions response envelope — only the fields we read.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    async fn extract(&self, body: &str) -> Result<Map<String, Value>, ExtractError> {
        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": EXTRACTION_PROMPT},
                {"role": "user", "content": body},
            ],
            "temperature": EXTRACTION_TEMPERATURE,
            "max_tokens": EXTRACTION_MAX_TOKENS,
        });

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ExtractError::RequestFailed {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::UpstreamStatus { status, body });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ExtractError::InvalidResponse {
                    reason: format!("malformed completion envelope: {e}"),
                })?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ExtractError::InvalidResponse {
                reason: "completion has no choices".into(),
            })?;

        tracing::debug!(chars = content.len(), "Extraction response received");
        parse_extraction(content)
    }
}
