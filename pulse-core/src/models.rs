use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::taxonomy::Topic;

/// One stored library entry: the structured extraction of a source post.
///
/// Rows are created once on successful analysis and never updated or deleted.
/// `id` and `created_at` are assigned on creation here rather than by the
/// store, so the server path and the local fallback path emit identical rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub url: Option<String>,
    pub primary_topic: Topic,
    pub secondary_topics: Vec<Topic>,
    /// Single-sentence factual takeaway.
    pub core_takeaway: String,
    /// Ordered bullets of concrete insights.
    pub summary: Vec<String>,
    /// Deeper strategic or tactical insights.
    pub key_insights: Vec<String>,
    /// Source content cleaned of emojis and fluff.
    pub original_text: String,
    pub created_at: DateTime<Utc>,
}

/// Who authored a chat line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One line of an in-session conversation. History lives in the caller's
/// memory for the duration of the session and is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
