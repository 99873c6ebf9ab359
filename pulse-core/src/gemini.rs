//! Gemini generation client.
//!
//! Thin wrapper over the `generateContent` REST endpoint. Callers provide a
//! system instruction, one user message, and optionally a structured-output
//! schema; the client returns the first candidate's text. Prompt text and
//! schemas are built in [`crate::prompt`], response parsing into domain types
//! happens in [`crate::analysis`] and [`crate::chat`].

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ModelConfig;

/// Model call errors.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Model returned no text candidates")]
    EmptyResponse,

    #[error("Missing API key")]
    MissingApiKey,
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

// ============================================================================
// GeminiClient
// ============================================================================

/// Gemini text-generation client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: ModelConfig,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String, config: ModelConfig) -> Result<Self, ModelError> {
        if api_key.is_empty() {
            return Err(ModelError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Run one `generateContent` call and return the first candidate's text.
    ///
    /// When `response_schema` is given, the request asks for `application/json`
    /// output constrained to that schema; the returned string is then the raw
    /// JSON document, to be parsed by the caller.
    pub async fn generate(
        &self,
        system_instruction: &str,
        user_message: &str,
        response_schema: Option<serde_json::Value>,
    ) -> Result<String, ModelError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.api_key
        );

        let generation_config = self.generation_config(response_schema);

        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: user_message.to_string(),
                }],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            }),
            generation_config,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_detail = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error);

            let (code, message) = error_detail
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            tracing::error!(code = code, message = %message, "Gemini API error");

            return Err(ModelError::Api { code, message });
        }

        let generate_response: GenerateResponse = response.json().await?;

        first_text(generate_response).ok_or(ModelError::EmptyResponse)
    }

    fn generation_config(
        &self,
        response_schema: Option<serde_json::Value>,
    ) -> Option<GenerationConfig> {
        let response_mime_type = response_schema
            .as_ref()
            .map(|_| "application/json".to_string());

        let config = GenerationConfig {
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
            response_mime_type,
            response_schema,
        };

        let all_unset = config.temperature.is_none()
            && config.max_output_tokens.is_none()
            && config.response_mime_type.is_none()
            && config.response_schema.is_none();

        if all_unset {
            None
        } else {
            Some(config)
        }
    }
}

/// Pull the first non-empty text part out of a response. Candidates without
/// content (e.g. safety-blocked) are skipped.
fn first_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates?
        .into_iter()
        .filter_map(|c| c.content)
        .filter_map(|c| c.parts)
        .flatten()
        .filter_map(|p| p.text)
        .find(|t| !t.trim().is_empty())
}

// ============================================================================
// TESTS
// ============================================================================
