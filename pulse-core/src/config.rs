use std::path::PathBuf;

use config::{Config, ConfigError, File};
use serde::Deserialize;

/// Model credential (Gemini API key).
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
/// Store endpoint (Supabase project URL).
pub const ENV_STORE_URL: &str = "SUPABASE_URL";
/// Store credential (Supabase anon key).
pub const ENV_STORE_KEY: &str = "SUPABASE_ANON_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PulseConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// How many recent posts ground a chat answer.
    pub context_posts: usize,
    /// How many insights per post are carried into the context.
    pub context_insights: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_posts: 50,
            context_insights: 3,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: "~/.pulse/library.json".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn expanded_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).into_owned())
    }
}

impl PulseConfig {
    /// Load from an optional TOML file. Every key has a default, so a
    /// missing file yields the stock configuration.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .build()?;
        s.try_deserialize()
    }
}

/// The three environment-provided endpoints/secrets. Presence is checked per
/// operation rather than at startup, so a partially configured deployment
/// still serves what it can and reports the rest by variable name.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub gemini_api_key: Option<String>,
    pub store_url: Option<String>,
    pub store_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: read_env(ENV_GEMINI_API_KEY),
            store_url: read_env(ENV_STORE_URL),
            store_key: read_env(ENV_STORE_KEY),
        }
    }

    /// Names of the variables the model path still needs.
    pub fn missing_model(&self) -> Vec<&'static str> {
        if self.gemini_api_key.is_some() {
            Vec::new()
        } else {
            vec![ENV_GEMINI_API_KEY]
        }
    }

    /// Names of the variables the store path still needs.
    pub fn missing_store(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.store_url.is_none() {
            missing.push(ENV_STORE_URL);
        }
        if self.store_key.is_none() {
            missing.push(ENV_STORE_KEY);
        }
        missing
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
