//! Library-grounded chat.
//!
//! The strategist answers only from the serialized library context: a
//! numbered digest of stored posts, capped per post at a configured number
//! of key insights. Conversation history is a view concern and is never
//! forwarded to the model.

use crate::error::PulseError;
use crate::gemini::GeminiClient;
use crate::models::Post;
use crate::prompt;

/// Context stand-in for an empty library. The instruction always carries a
/// context block, so the model declines gracefully instead of improvising.
pub const EMPTY_LIBRARY_CONTEXT: &str =
    "The library is currently empty. No marketing insights found.";

/// Reject empty or whitespace-only questions before any tier is attempted.
pub fn validate_message(message: &str) -> Result<(), PulseError> {
    if message.trim().is_empty() {
        return Err(PulseError::Validation(
            "chat message must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Serialize the library into the grounding context, newest first as given.
pub fn build_context(posts: &[Post], max_insights: usize) -> String {
    if posts.is_empty() {
        return EMPTY_LIBRARY_CONTEXT.to_string();
    }

    posts
        .iter()
        .enumerate()
        .map(|(i, post)| {
            let insights = post
                .key_insights
                .iter()
                .take(max_insights)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "POST #{}:\nTitle: {}\nCategory: {}\nTakeaway: {}\nInsights: {}",
                i + 1,
                post.title,
                post.primary_topic,
                post.core_takeaway,
                insights
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Ask the strategist one question against a prepared context.
pub async fn answer(
    model: &GeminiClient,
    question: &str,
    context: &str,
) -> Result<String, PulseError> {
    let instruction = prompt::strategist_instruction(context);
    let text = model.generate(&instruction, question, None).await?;
    require_substance(text)
}

fn require_substance(text: String) -> Result<String, PulseError> {
    if text.trim().is_empty() {
        return Err(PulseError::Chat(
            "model returned a blank answer".to_string(),
        ));
    }
    Ok(text)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::taxonomy::Topic;
    use chrono::Utc;
    use uuid::Uuid;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_post(title: &str, insights: &[&str]) -> Post {
        Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            url: None,
            primary_topic: Topic::LeadGeneration,
            secondary_topics: vec![],
            core_takeaway: format!("{} takeaway", title),
            summary: vec![],
            key_insights: insights.iter().map(|s| s.to_string()).collect(),
            original_text: "o".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn context_numbers_posts_and_caps_insights() {
        let posts = vec![
            sample_post("Outbound assist", &["one", "two", "three", "four"]),
            sample_post("Lead magnets", &["solo"]),
        ];

        let context = build_context(&posts, 3);

        assert!(context.starts_with("POST #1:\nTitle: Outbound assist"));
        assert!(context.contains("POST #2:\nTitle: Lead magnets"));
        assert!(context.contains("Category: Lead Generation"));
        assert!(context.contains("Takeaway: Outbound assist takeaway"));
        assert!(context.contains("Insights: one, two, three"));
        assert!(!context.contains("four"));
    }

    #[test]
    fn empty_library_uses_the_sentinel_context() {
        assert_eq!(build_context(&[], 3), EMPTY_LIBRARY_CONTEXT);
    }

    #[test]
    fn blank_questions_fail_validation() {
        assert!(matches!(
            validate_message(" \n"),
            Err(PulseError::Validation(_))
        ));
        assert!(validate_message("What works on Meta?").is_ok());
    }

    #[test]
    fn blank_answers_are_a_chat_error() {
        assert!(matches!(
            require_substance("   ".to_string()),
            Err(PulseError::Chat(_))
        ));
        assert_eq!(require_substance("Use cost caps.".to_string()).unwrap(), "Use cost caps.");
    }

    #[tokio::test]
    async fn answer_grounds_the_model_in_the_context() {
        let mock_server = MockServer::start().await;
        let config = ModelConfig {
            base_url: mock_server.uri(),
            ..ModelConfig::default()
        };
        let model = GeminiClient::new("test-api-key".to_string(), config).unwrap();

        Mock::given(method("POST"))
            .and(body_string_contains("POST #1:"))
            .and(body_string_contains("What works on Meta?"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "**Cost caps** scale cleanly." }] }
                }]
            })))
            .mount(&mock_server)
            .await;

        let context = build_context(&[sample_post("Cost caps", &["cap early"])], 3);
        let reply = answer(&model, "What works on Meta?", &context).await.unwrap();
        assert_eq!(reply, "**Cost caps** scale cleanly.");
    }

    #[tokio::test]
    async fn answer_with_an_empty_library_sends_the_sentinel() {
        let mock_server = MockServer::start().await;
        let config = ModelConfig {
            base_url: mock_server.uri(),
            ..ModelConfig::default()
        };
        let model = GeminiClient::new("test-api-key".to_string(), config).unwrap();

        Mock::given(method("POST"))
            .and(body_string_contains(
                "The library is currently empty. No marketing insights found.",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "The library has no posts yet." }] }
                }]
            })))
            .mount(&mock_server)
            .await;

        let context = build_context(&[], 3);
        let reply = answer(&model, "Anything on TikTok?", &context).await.unwrap();
        assert!(!reply.is_empty());
    }
}
