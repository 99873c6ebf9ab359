//! Tiered fallback policy.
//!
//! One client collapses the per-operation degradation paths: the hosted
//! server is always tier one, a direct model call (with the local cache as
//! its persistence) is tier two for analyze and chat, and the cache is the
//! read tier for fetches. Each tier is attempted at most once per call, in
//! order, and the terminal error reports every tier's failure by name.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::analysis;
use crate::cache::LocalCache;
use crate::chat;
use crate::config::{ChatConfig, ENV_GEMINI_API_KEY};
use crate::error::PulseError;
use crate::gemini::GeminiClient;
use crate::models::{ChatMessage, Post};

/// Which tier served a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Server,
    DirectModel,
    LocalCache,
}

impl Tier {
    pub fn is_primary(&self) -> bool {
        matches!(self, Tier::Server)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Server => "server",
            Tier::DirectModel => "direct model",
            Tier::LocalCache => "local cache",
        }
    }
}

// ============================================================================
// ServerApi
// ============================================================================

/// Server tier call errors.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
}

/// What `/health` reports.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub version: Option<String>,
    pub posts: Option<u64>,
    pub model_credential: Option<bool>,
}

/// Typed client for the pulse-server HTTP surface.
#[derive(Debug, Clone)]
pub struct ServerApi {
    client: Client,
    base_url: String,
}

impl ServerApi {
    pub fn new(base_url: String) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn analyze(&self, content: &str, url: Option<&str>) -> Result<Post, ServerError> {
        let response = self
            .client
            .post(format!("{}/api/analyze", self.base_url))
            .json(&AnalyzeRequest { content, url })
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    pub async fn chat(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<String, ServerError> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&ChatRequest { message, history })
            .send()
            .await?;

        let response = Self::check(response).await?;
        let body: ChatResponse = response.json().await?;
        Ok(body.text)
    }

    pub async fn posts(&self) -> Result<Vec<Post>, ServerError> {
        let response = self
            .client
            .get(format!("{}/api/posts", self.base_url))
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch `/health`. The report body is returned for any status that
    /// carries one, so callers can render degraded states.
    pub async fn health(&self) -> Result<HealthReport, ServerError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        Ok(response.json().await?)
    }

    /// Surface the server's JSON `error` message on non-2xx.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ServerError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&error_body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or(error_body);

        Err(ServerError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

// ============================================================================
// FallbackClient
// ============================================================================

/// The tier walker. `server` and `model` are optional so a partially
/// configured client still serves what it can; the cache is always present.
pub struct FallbackClient {
    server: Option<ServerApi>,
    model: Option<GeminiClient>,
    cache: LocalCache,
    chat: ChatConfig,
}

impl FallbackClient {
    pub fn new(
        server: Option<ServerApi>,
        model: Option<GeminiClient>,
        cache: LocalCache,
        chat: ChatConfig,
    ) -> Self {
        Self {
            server,
            model,
            cache,
            chat,
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn server(&self) -> Option<&ServerApi> {
        self.server.as_ref()
    }

    /// Analyze a post: server first, then the model directly (persisting the
    /// result to the cache), then a terminal per-tier report.
    pub async fn analyze(
        &self,
        content: &str,
        url: Option<&str>,
    ) -> Result<(Post, Tier), PulseError> {
        analysis::validate_content(content)?;

        let mut attempts = Vec::new();

        match &self.server {
            Some(server) => match server.analyze(content, url).await {
                Ok(post) => {
                    tracing::debug!(tier = "server", "analysis served");
                    return Ok((post, Tier::Server));
                }
                Err(e) => {
                    tracing::debug!(tier = "server", error = %e, "tier failed, falling back");
                    attempts.push(format!("server: {}", e));
                }
            },
            None => attempts.push("server: not configured".to_string()),
        }

        match &self.model {
            Some(model) => match self.analyze_direct(model, content, url).await {
                Ok(post) => {
                    tracing::debug!(tier = "direct-model", "analysis served");
                    return Ok((post, Tier::DirectModel));
                }
                Err(e) if e.advances_fallback() => {
                    tracing::debug!(tier = "direct-model", error = %e, "tier failed");
                    attempts.push(format!("direct model: {}", e));
                }
                Err(e) => return Err(e),
            },
            None => attempts.push(format!(
                "direct model: missing configuration: {}",
                ENV_GEMINI_API_KEY
            )),
        }

        Err(PulseError::TiersExhausted { attempts })
    }

    /// Fetch the library: server first, cache second. A missing cache file is
    /// an empty library, so this only errors on an unreadable cache path.
    pub async fn fetch_posts(&self) -> Result<(Vec<Post>, Tier), PulseError> {
        if let Some(server) = &self.server {
            match server.posts().await {
                Ok(posts) => {
                    tracing::debug!(tier = "server", count = posts.len(), "library served");
                    return Ok((posts, Tier::Server));
                }
                Err(e) => {
                    tracing::debug!(tier = "server", error = %e, "tier failed, reading cache");
                }
            }
        }

        let posts = self.cache.read_posts()?;
        Ok((posts, Tier::LocalCache))
    }

    /// Chat: server first, then the model directly with context rebuilt from
    /// the cache, then a terminal per-tier report.
    pub async fn chat(
        &self,
        message: &str,
        history: &[ChatMessage],
    ) -> Result<(String, Tier), PulseError> {
        chat::validate_message(message)?;

        let mut attempts = Vec::new();

        match &self.server {
            Some(server) => match server.chat(message, history).await {
                Ok(text) => {
                    tracing::debug!(tier = "server", "chat served");
                    return Ok((text, Tier::Server));
                }
                Err(e) => {
                    tracing::debug!(tier = "server", error = %e, "tier failed, falling back");
                    attempts.push(format!("server: {}", e));
                }
            },
            None => attempts.push("server: not configured".to_string()),
        }

        match &self.model {
            Some(model) => match self.chat_direct(model, message).await {
                Ok(text) => {
                    tracing::debug!(tier = "direct-model", "chat served");
                    return Ok((text, Tier::DirectModel));
                }
                Err(e) if e.advances_fallback() => {
                    tracing::debug!(tier = "direct-model", error = %e, "tier failed");
                    attempts.push(format!("direct model: {}", e));
                }
                Err(e) => return Err(e),
            },
            None => attempts.push(format!(
                "direct model: missing configuration: {}",
                ENV_GEMINI_API_KEY
            )),
        }

        Err(PulseError::TiersExhausted { attempts })
    }

    async fn analyze_direct(
        &self,
        model: &GeminiClient,
        content: &str,
        url: Option<&str>,
    ) -> Result<Post, PulseError> {
        let analysis = analysis::analyze_post(model, content, url).await?;
        let post = Post::from_analysis(analysis, url.map(str::to_string));
        self.cache.prepend_post(&post)?;
        Ok(post)
    }

    async fn chat_direct(&self, model: &GeminiClient, message: &str) -> Result<String, PulseError> {
        // The server already failed this call, so context comes from the
        // cache rather than a second server round-trip.
        let posts = self.cache.read_posts()?;
        let capped: Vec<Post> = posts.into_iter().take(self.chat.context_posts).collect();
        let context = chat::build_context(&capped, self.chat.context_insights);
        chat::answer(model, message, &context).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
