//! Chat gateway: ground the strategist in the freshest stored posts.

use pulse_core::config::ChatConfig;
use pulse_core::{chat, GeminiClient, PulseError, StoreClient};

/// Validate, fetch the context window, answer.
pub async fn run(
    model: &GeminiClient,
    store: &StoreClient,
    message: &str,
    chat_config: &ChatConfig,
) -> Result<String, PulseError> {
    chat::validate_message(message)?;

    let posts = store.list_posts(Some(chat_config.context_posts)).await?;
    let context = chat::build_context(&posts, chat_config.context_insights);

    chat::answer(model, message, &context).await
}
