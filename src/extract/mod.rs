//! Candidate-data extraction from free-text email bodies.
//!
//! The extraction service is an opaque, fallible function from text to a
//! JSON object. The instruction prompt is fixed; the response may arrive
//! wrapped in a markdown code fence, so parsing is two-stage: a documented
//! fence-stripping transformation, then a strict JSON-object parse that
//! fails loudly on anything else. No retry — one failed attempt fails the
//! item.

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Map, Value};

use crate::error::ExtractError;
use crate::pipeline::types::json_type_name;

pub use openai::OpenAiExtractor;

/// Fixed instruction prompt describing the target field schema.
pub const EXTRACTION_PROMPT: &str = "\
From the following email text, extract these entities and return them as a single JSON object:\n\
Candidate Name: exact name, word for word, capitalized\n\
Date Of Birth: DD/MM\n\
Gender:\n\
Education:\n\
University:\n\
Total Experience: years, as an integer\n\
State: two-letter abbreviation\n\
Technology:\n\
End Client:\n\
Interview Round:\n\
Job Title:\n\
Email ID:\n\
Contact No:\n\
Date of Interview: MM/DD/YYYY\n\
Start Time Of Interview: 12-hour clock with AM/PM, Eastern time\n\
End Time Of Interview: 12-hour clock with AM/PM, Eastern time; if absent, add the stated duration to the start time\n\
Omit nothing; use null for fields the text does not mention. Respond with ONLY the JSON object.";

/// Extraction service boundary — opaque text-to-fields mapping.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract structured fields from one email body.
    async fn extract(&self, body: &str) -> Result<Map<String, Value>, ExtractError>;
}

/// Configuration for the extraction client.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub api_key: SecretString,
    pub model: String,
}

/// Create the production extractor from configuration.
pub fn create_extractor(config: &ExtractorConfig) -> Arc<dyn Extractor> {
    tracing::info!(model = %config.model, "Using OpenAI extraction");
    Arc::new(OpenAiExtractor::new(
        config.api_key.clone(),
        config.model.clone(),
    ))
}

// ── Response parsing ────────────────────────────────────────────────

/// Strip a markdown code fence from the service's text response.
///
/// Removes a leading ``` fence (with an optional language tag on the fence
/// line) and a trailing ``` fence. Anything without a fence passes through
/// trimmed. This is the only tolerated decoration — everything else must be
/// valid JSON.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the rest of the fence line (e.g. "json")
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a raw service response into extracted fields.
///
/// Fence-strips, then requires a JSON object — any residual malformation is
/// an [`ExtractError::InvalidResponse`].
pub fn parse_extraction(raw: &str) -> Result<Map<String, Value>, ExtractError> {
    let cleaned = strip_code_fence(raw);
    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| ExtractError::InvalidResponse {
            reason: format!("response is not valid JSON: {e}"),
        })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExtractError::InvalidResponse {
            reason: format!("expected a JSON object, got {}", json_type_name(&other)),
        }),
    }
}
