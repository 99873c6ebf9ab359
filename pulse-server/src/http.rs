//! MarketerPulse HTTP REST API
//!
//! Axum server exposing the analysis, library, and chat operations.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a
//! pure inner function. The inner functions are directly testable without
//! axum dispatch machinery.
//!
//! Endpoints:
//! - GET  /health       — health check with store row count
//! - GET  /version      — server version info
//! - POST /api/analyze  — analyze one post and persist it
//! - POST /api/chat     — library-grounded strategist answer
//! - GET  /api/posts    — the stored library, newest first

use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use pulse_core::analysis;
use pulse_core::chat;
use pulse_core::{
    ChatMessage, Credentials, GeminiClient, PulseConfig, PulseError, StoreClient,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::gateways;

/// Shared state for all HTTP handlers. Clients are built once at startup;
/// absent credentials leave the corresponding client unset, and requests that
/// need it answer with the missing variable names.
#[derive(Clone)]
pub struct HttpState {
    pub model: Option<GeminiClient>,
    pub store: Option<StoreClient>,
    pub config: PulseConfig,
    pub credentials: Credentials,
}

impl HttpState {
    pub fn new(config: PulseConfig, credentials: Credentials) -> Result<Self, PulseError> {
        let model = match &credentials.gemini_api_key {
            Some(key) => Some(GeminiClient::new(key.clone(), config.model.clone())?),
            None => None,
        };

        let store = match (&credentials.store_url, &credentials.store_key) {
            (Some(url), Some(key)) => Some(StoreClient::new(url.clone(), key.clone())?),
            _ => None,
        };

        Ok(Self {
            model,
            store,
            config,
            credentials,
        })
    }

    fn require_model(&self) -> Result<&GeminiClient, PulseError> {
        self.model.as_ref().ok_or_else(|| PulseError::Configuration {
            missing: self.credentials.missing_model(),
        })
    }

    fn require_store(&self) -> Result<&StoreClient, PulseError> {
        self.store.as_ref().ok_or_else(|| PulseError::Configuration {
            missing: self.credentials.missing_store(),
        })
    }

    /// Analyze and chat need both clients; report every missing variable in
    /// one message rather than one at a time.
    fn require_model_and_store(&self) -> Result<(&GeminiClient, &StoreClient), PulseError> {
        match (&self.model, &self.store) {
            (Some(model), Some(store)) => Ok((model, store)),
            _ => {
                let mut missing = self.credentials.missing_model();
                missing.extend(self.credentials.missing_store());
                Err(PulseError::Configuration { missing })
            }
        }
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/posts", get(posts_handler))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = build_router(Arc::new(state));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("MarketerPulse API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct AnalyzeRequest {
    pub content: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChatRequest {
    pub message: Option<String>,
    /// Session transcript. Accepted for API symmetry with the client, held
    /// only for logging; answers are grounded in the library, not the
    /// transcript.
    pub history: Option<Vec<ChatMessage>>,
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner analyze — validate, check configuration, run the gateway.
pub async fn analyze_inner(
    state: &HttpState,
    req: AnalyzeRequest,
) -> (StatusCode, serde_json::Value) {
    let result = async {
        let content = req.content.unwrap_or_default();
        analysis::validate_content(&content)?;

        let (model, store) = state.require_model_and_store()?;
        let post = gateways::analyze::run(model, store, &content, req.url.as_deref()).await?;
        Ok(json_body(&post))
    }
    .await;

    match result {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => error_response(&e),
    }
}

/// Inner chat — validate, check configuration, run the gateway.
pub async fn chat_inner(state: &HttpState, req: ChatRequest) -> (StatusCode, serde_json::Value) {
    let result = async {
        let message = req.message.unwrap_or_default();
        chat::validate_message(&message)?;

        if let Some(history) = &req.history {
            tracing::debug!(turns = history.len(), "chat history accepted, not forwarded");
        }

        let (model, store) = state.require_model_and_store()?;
        let text = gateways::chat::run(model, store, &message, &state.config.chat).await?;
        Ok(serde_json::json!({ "text": text }))
    }
    .await;

    match result {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => error_response(&e),
    }
}

/// Inner posts — list the library, newest first.
pub async fn posts_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    let result = async {
        let store = state.require_store()?;
        let posts = gateways::library::run(store, None).await?;
        Ok(json_body(&posts))
    }
    .await;

    match result {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => error_response(&e),
    }
}

/// Inner health check — counts store rows and returns (status_code, body).
pub async fn health_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    let store = match state.require_store() {
        Ok(store) => store,
        Err(e) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "unconfigured",
                    "version": env!("CARGO_PKG_VERSION"),
                    "error": e.to_string(),
                    "model_credential": state.model.is_some(),
                }),
            );
        }
    };

    match store.count_posts().await {
        Ok(posts) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "posts": posts,
                "model_credential": state.model.is_some(),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "version": env!("CARGO_PKG_VERSION"),
                "error": e.to_string(),
                "model_credential": state.model.is_some(),
            }),
        ),
    }
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "api": "pulse/1",
    })
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn analyze_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    let (status, body) = analyze_inner(&state, req).await;
    (status, Json(body))
}

pub async fn chat_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let (status, body) = chat_inner(&state, req).await;
    (status, Json(body))
}

pub async fn posts_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = posts_inner(&state).await;
    (status, Json(body))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Map a domain error to its HTTP rendition: the taxonomy decides the code,
/// the message is always readable JSON.
pub fn error_response(err: &PulseError) -> (StatusCode, serde_json::Value) {
    let status = StatusCode::from_u16(err.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (status, serde_json::to_value(ErrorResponse::new(err.to_string())).unwrap_or_default())
}

fn json_body<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|_| serde_json::json!({}))
}

// ============================================================================
// Unit Tests — inner functions against hermetic mock upstreams
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::config::ModelConfig;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn full_state(gemini_url: &str, store_url: &str) -> HttpState {
        let config = PulseConfig {
            model: ModelConfig {
                base_url: gemini_url.to_string(),
                ..ModelConfig::default()
            },
            ..PulseConfig::default()
        };
        let credentials = Credentials {
            gemini_api_key: Some("test-api-key".to_string()),
            store_url: Some(store_url.to_string()),
            store_key: Some("anon-key".to_string()),
        };
        HttpState::new(config, credentials).unwrap()
    }

    fn bare_state() -> HttpState {
        HttpState::new(PulseConfig::default(), Credentials::default()).unwrap()
    }

    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string(), "version must be string");
        assert_eq!(v["api"], "pulse/1");
    }

    #[tokio::test]
    async fn test_analyze_inner_blank_content_is_400() {
        let state = bare_state();

        let req = AnalyzeRequest {
            content: Some("   ".to_string()),
            url: None,
        };

        let (status, body) = analyze_inner(&state, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_analyze_inner_missing_content_is_400() {
        let state = bare_state();

        let (status, body) = analyze_inner(&state, AnalyzeRequest::default()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_analyze_inner_names_every_missing_variable() {
        let state = bare_state();

        let req = AnalyzeRequest {
            content: Some("a real post".to_string()),
            url: None,
        };

        let (status, body) = analyze_inner(&state, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("GEMINI_API_KEY"), "got: {}", message);
        assert!(message.contains("SUPABASE_URL"), "got: {}", message);
        assert!(message.contains("SUPABASE_ANON_KEY"), "got: {}", message);
    }

    #[tokio::test]
    async fn test_chat_inner_missing_message_is_400() {
        let state = bare_state();

        let (status, body) = chat_inner(&state, ChatRequest::default()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_chat_inner_configuration_is_checked_before_any_call() {
        let state = bare_state();

        let req = ChatRequest {
            message: Some("what works?".to_string()),
            history: Some(vec![ChatMessage::user("earlier")]),
        };

        let (status, body) = chat_inner(&state, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("missing configuration"));
    }

    #[tokio::test]
    async fn test_posts_inner_passes_the_store_list_through() {
        let store = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/marketing_posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&store)
            .await;

        let state = full_state("http://127.0.0.1:9", &store.uri());
        let (status, body) = posts_inner(&state).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_array());
    }

    #[tokio::test]
    async fn test_posts_inner_surfaces_store_errors() {
        let store = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "message": "JWT expired"
            })))
            .mount(&store)
            .await;

        let state = full_state("http://127.0.0.1:9", &store.uri());
        let (status, body) = posts_inner(&state).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("JWT expired"));
    }

    #[tokio::test]
    async fn test_health_inner_reports_healthy_with_count() {
        let store = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/rest/v1/marketing_posts"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "0-9/42"))
            .mount(&store)
            .await;

        let state = full_state("http://127.0.0.1:9", &store.uri());
        let (status, body) = health_inner(&state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["posts"], 42);
        assert_eq!(body["model_credential"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_health_inner_unconfigured_without_store() {
        let state = bare_state();

        let (status, body) = health_inner(&state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unconfigured");
        assert!(body["error"].as_str().unwrap().contains("SUPABASE_URL"));
        assert_eq!(body["model_credential"], false);
    }

    #[tokio::test]
    async fn test_health_inner_unhealthy_when_the_store_fails() {
        let store = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "message": "connection pool exhausted"
            })))
            .mount(&store)
            .await;

        let state = full_state("http://127.0.0.1:9", &store.uri());
        let (status, body) = health_inner(&state).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_analyze_inner_stores_and_echoes_the_row() {
        let gemini = MockServer::start().await;
        let analysis_text = serde_json::json!({
            "title": "Cost cap scaling on Meta",
            "primary_topic": "Media Buying & Scaling",
            "secondary_topics": ["Meta Ads"],
            "core_takeaway": "Scale with cost caps, not budget jumps.",
            "summary": ["Raise caps 10% at a time."],
            "key_insights": ["Budget doubles reset learning."],
            "original_text": "We scaled with cost caps."
        })
        .to_string();

        Mock::given(method("POST"))
            .and(path("/models/gemini-3-flash-preview:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": analysis_text }] } }]
            })))
            .mount(&gemini)
            .await;

        // The response body is whatever row the store echoes back, id and
        // timestamp included.
        let stored_row = serde_json::json!({
            "id": "7b5c24ab-1234-5678-9abc-def012345678",
            "title": "Cost cap scaling on Meta",
            "url": "https://li.example/p/7",
            "primary_topic": "Media Buying & Scaling",
            "secondary_topics": ["Meta Ads"],
            "core_takeaway": "Scale with cost caps, not budget jumps.",
            "summary": ["Raise caps 10% at a time."],
            "key_insights": ["Budget doubles reset learning."],
            "original_text": "We scaled with cost caps.",
            "created_at": "2026-08-24T08:00:00Z"
        });

        let store = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/marketing_posts"))
            .and(header("Prefer", "return=representation"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!([stored_row.clone()])),
            )
            .mount(&store)
            .await;

        let state = full_state(&gemini.uri(), &store.uri());
        let req = AnalyzeRequest {
            content: Some("We scaled with cost caps.".to_string()),
            url: Some("https://li.example/p/7".to_string()),
        };

        let (status, body) = analyze_inner(&state, req).await;
        assert_eq!(status, StatusCode::OK, "body: {}", body);
        assert_eq!(body["id"], stored_row["id"]);
        assert_eq!(body["title"], "Cost cap scaling on Meta");
        assert_eq!(body["primary_topic"], "Media Buying & Scaling");
        assert_eq!(body["url"], "https://li.example/p/7");
    }

    #[tokio::test]
    async fn test_chat_inner_grounds_in_the_stored_library() {
        let store = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/marketing_posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": "7b5c24ab-1234-5678-9abc-def012345678",
                "title": "Hook-first creative",
                "url": null,
                "primary_topic": "Creative Testing",
                "secondary_topics": [],
                "core_takeaway": "Lead with the hook.",
                "summary": [],
                "key_insights": ["First 2 seconds decide retention."],
                "original_text": "o",
                "created_at": "2026-08-24T08:00:00Z"
            }])))
            .mount(&store)
            .await;

        let gemini = MockServer::start().await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::body_string_contains("Hook-first creative"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "Lead with **hooks**." }] } }]
            })))
            .mount(&gemini)
            .await;

        let state = full_state(&gemini.uri(), &store.uri());
        let req = ChatRequest {
            message: Some("What creative advice is in the library?".to_string()),
            history: None,
        };

        let (status, body) = chat_inner(&state, req).await;
        assert_eq!(status, StatusCode::OK, "body: {}", body);
        assert_eq!(body["text"], "Lead with **hooks**.");
    }

    #[tokio::test]
    async fn test_error_response_maps_the_taxonomy() {
        let (status, body) = error_response(&PulseError::Validation("empty".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (status, _) = error_response(&PulseError::Chat("blank".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
