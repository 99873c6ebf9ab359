use thiserror::Error;

use crate::cache::CacheError;
use crate::gemini::ModelError;
use crate::store::StoreError;

/// Crate-wide error taxonomy.
///
/// Validation and Configuration failures are final for the call that raised
/// them; upstream failures (model, store, malformed output) are what the
/// fallback tiers exist to recover from.
#[derive(Error, Debug)]
pub enum PulseError {
    /// Bad caller input. Raised before any network call is attempted.
    #[error("{0}")]
    Validation(String),

    /// Required environment configuration is absent. Names every missing
    /// variable so a misconfigured deployment is diagnosable from the
    /// message alone.
    #[error("missing configuration: {}", .missing.join(", "))]
    Configuration { missing: Vec<&'static str> },

    #[error("model request failed: {0}")]
    Model(#[from] ModelError),

    #[error("store request failed: {0}")]
    Store(#[from] StoreError),

    /// The model answered, but the payload does not conform to the analysis
    /// schema. Distinct from a network failure.
    #[error("model output did not match the analysis schema: {0}")]
    Parse(String),

    /// The model returned a blank chat answer.
    #[error("chat failed: {0}")]
    Chat(String),

    #[error("fallback cache error: {0}")]
    Cache(#[from] CacheError),

    /// Every applicable fallback tier was attempted and failed. The report
    /// lists each tier's failure, including which configuration is missing.
    #[error("all fallback tiers failed: {}", .attempts.join("; "))]
    TiersExhausted { attempts: Vec<String> },
}

impl PulseError {
    /// Whether a failure of this kind should advance to the next fallback
    /// tier. Validation and Configuration are final: another tier cannot fix
    /// the caller's input or the environment.
    pub fn advances_fallback(&self) -> bool {
        !matches!(
            self,
            PulseError::Validation(_) | PulseError::Configuration { .. }
        )
    }

    /// HTTP status for the API surface.
    pub fn status_code(&self) -> u16 {
        match self {
            PulseError::Validation(_) => 400,
            _ => 500,
        }
    }
}
