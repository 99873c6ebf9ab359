pub mod analysis;
pub mod cache;
pub mod chat;
pub mod config;
pub mod error;
pub mod fallback;
pub mod gemini;
pub mod models;
pub mod prompt;
pub mod store;
pub mod taxonomy;

pub use analysis::PostAnalysis;
pub use cache::{CacheError, LocalCache};
pub use config::{
    Credentials, PulseConfig, ENV_GEMINI_API_KEY, ENV_STORE_KEY, ENV_STORE_URL,
};
pub use error::PulseError;
pub use fallback::{FallbackClient, HealthReport, ServerApi, ServerError, Tier};
pub use gemini::{GeminiClient, ModelError};
pub use models::{ChatMessage, ChatRole, Post};
pub use store::{StoreClient, StoreError};
pub use taxonomy::Topic;
