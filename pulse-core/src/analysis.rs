//! Post analysis pipeline.
//!
//! Sends a source post to the model with the structured-output schema, then
//! validates the returned JSON into domain types. Parsing is deliberately
//! strict about the primary topic: an off-taxonomy label fails the call
//! rather than being silently remapped.

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::PulseError;
use crate::gemini::GeminiClient;
use crate::models::Post;
use crate::prompt;
use crate::taxonomy::Topic;

/// Validated model extraction, before persistence assigns identity.
#[derive(Debug, Clone)]
pub struct PostAnalysis {
    pub title: String,
    pub primary_topic: Topic,
    pub secondary_topics: Vec<Topic>,
    pub core_takeaway: String,
    pub summary: Vec<String>,
    pub key_insights: Vec<String>,
    pub original_text: String,
}

/// Untyped stage straight off the wire: topics still strings.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    title: String,
    primary_topic: String,
    #[serde(default)]
    secondary_topics: Vec<String>,
    core_takeaway: String,
    #[serde(default)]
    summary: Vec<String>,
    #[serde(default)]
    key_insights: Vec<String>,
    original_text: String,
}

/// Reject empty or whitespace-only input before any network call.
pub fn validate_content(content: &str) -> Result<(), PulseError> {
    if content.trim().is_empty() {
        return Err(PulseError::Validation(
            "post content must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Run the full analysis: prompt, generate, parse, validate topics.
pub async fn analyze_post(
    model: &GeminiClient,
    content: &str,
    url: Option<&str>,
) -> Result<PostAnalysis, PulseError> {
    validate_content(content)?;

    let system = prompt::analyst_instruction();
    let user = prompt::analysis_user_prompt(content, url);
    let schema = prompt::analysis_response_schema();

    let raw = model.generate(&system, &user, Some(schema)).await?;

    parse_analysis(&raw)
}

/// Parse and validate one model payload.
pub fn parse_analysis(raw_json: &str) -> Result<PostAnalysis, PulseError> {
    let payload = strip_code_fences(raw_json);

    let raw: RawAnalysis =
        serde_json::from_str(payload).map_err(|e| PulseError::Parse(e.to_string()))?;

    let primary_topic = Topic::parse_lenient(&raw.primary_topic).ok_or_else(|| {
        PulseError::Parse(format!("unknown primary topic {:?}", raw.primary_topic))
    })?;

    let secondary_topics = raw
        .secondary_topics
        .iter()
        .filter_map(|label| {
            let topic = Topic::parse_lenient(label);
            if topic.is_none() {
                tracing::warn!(label = %label, "dropping secondary topic outside the taxonomy");
            }
            topic
        })
        .collect();

    Ok(PostAnalysis {
        title: raw.title,
        primary_topic,
        secondary_topics,
        core_takeaway: raw.core_takeaway,
        summary: raw.summary,
        key_insights: raw.key_insights,
        original_text: raw.original_text,
    })
}

/// Strip a Markdown code fence (``` or ```json) wrapped around a payload.
/// The model occasionally fences its JSON even when a schema was requested.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    match rest.strip_suffix("```") {
        Some(body) => body.trim_end(),
        None => trimmed,
    }
}

impl Post {
    /// Mint a library row from a validated analysis. Identity and timestamp
    /// are assigned here so every persistence path stores the same shape.
    pub fn from_analysis(analysis: PostAnalysis, url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: analysis.title,
            url,
            primary_topic: analysis.primary_topic,
            secondary_topics: analysis.secondary_topics,
            core_takeaway: analysis.core_takeaway,
            summary: analysis.summary,
            key_insights: analysis.key_insights,
            original_text: analysis.original_text,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
