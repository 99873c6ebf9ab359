//! Prompt and structured-output schema construction. Pure data: everything
//! here is deterministic text assembly, kept separate from the HTTP clients
//! so the exact wire payloads are testable offline.

use crate::taxonomy::Topic;

/// System instruction for post analysis. The taxonomy is enumerated inline so
/// the model cannot invent categories.
pub fn analyst_instruction() -> String {
    format!(
        "You are a high-level marketing analyst. Your goal is to capture the true substance of LinkedIn marketing posts.\n\
         Ruthlessly remove fluff, hooks, storytelling, emojis, and generic motivation.\n\
         Ignore personal backstories unless they introduce a concrete lesson.\n\
         Convert vague statements into explicit claims.\n\
         Preserve nuance and constraints.\n\n\
         Classification must be strictly from these primary categories: {}.\n\n\
         Summary rules:\n\
         - Use bullet points for distinct, concrete insights.\n\
         - No filler, no repetition, no vague advice.\n\
         - Prefer clarity over elegance.\n\
         - Be as detailed as necessary in the summary and key insights.",
        Topic::prompt_list()
    )
}

pub fn analysis_user_prompt(content: &str, url: Option<&str>) -> String {
    format!(
        "Analyze this LinkedIn post:\n\nURL: {}\nContent:\n{}",
        url.unwrap_or("Not provided"),
        content
    )
}

/// Structured-output schema for the analysis call, in the Gemini REST
/// `responseSchema` format. All seven fields are mandatory in the response.
pub fn analysis_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": "Descriptive, factual title (not catchy)"
            },
            "primary_topic": {
                "type": "STRING",
                "description": "The single most relevant category"
            },
            "secondary_topics": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Relevant marketing sub-topics"
            },
            "core_takeaway": {
                "type": "STRING",
                "description": "Single sentence factual core takeaway"
            },
            "summary": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Bullet points of concrete insights and learnings"
            },
            "key_insights": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Deeper strategic or tactical insights extracted"
            },
            "original_text": {
                "type": "STRING",
                "description": "The original post content cleaned of emojis and fluff"
            }
        },
        "required": [
            "title",
            "primary_topic",
            "secondary_topics",
            "core_takeaway",
            "summary",
            "key_insights",
            "original_text"
        ]
    })
}

/// System instruction for the Growth Strategist chat, grounding the model in
/// the serialized library context.
pub fn strategist_instruction(context: &str) -> String {
    format!(
        "You are the MarketerPulse AI Growth Strategist.\n\
         Your knowledge is strictly limited to the provided marketing library context below.\n\
         Your goal is to help the user synthesize strategies, identify trends, and extract specific tactics from the library.\n\n\
         GUIDELINES:\n\
         1. Only use information from the provided library context.\n\
         2. If a question cannot be answered using the library, politely state that the current library doesn't contain that specific information.\n\
         3. Be strategic, professional, and clear.\n\
         4. Use Markdown for lists and bold text to highlight key tactics.\n\n\
         LIBRARY CONTEXT:\n{}",
        context
    )
}
