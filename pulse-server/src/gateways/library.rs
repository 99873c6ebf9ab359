//! Library gateway: newest-first listing passthrough.

use pulse_core::{Post, PulseError, StoreClient};

pub async fn run(store: &StoreClient, limit: Option<usize>) -> Result<Vec<Post>, PulseError> {
    Ok(store.list_posts(limit).await?)
}
