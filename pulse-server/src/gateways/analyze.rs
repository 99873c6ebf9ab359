//! Analyze gateway: model extraction, then persistence.

use pulse_core::analysis;
use pulse_core::{GeminiClient, Post, PulseError, StoreClient};

/// Validate, analyze, persist. Returns the row as the store echoed it back,
/// so the caller sees exactly what the library now holds.
pub async fn run(
    model: &GeminiClient,
    store: &StoreClient,
    content: &str,
    url: Option<&str>,
) -> Result<Post, PulseError> {
    let analysis = analysis::analyze_post(model, content, url).await?;
    let post = Post::from_analysis(analysis, url.map(str::to_string));
    let stored = store.insert_post(&post).await?;

    tracing::info!(
        id = %stored.id,
        topic = %stored.primary_topic,
        "post analyzed and stored"
    );

    Ok(stored)
}
