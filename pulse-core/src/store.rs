//! Hosted library store client.
//!
//! Talks PostgREST to the `marketing_posts` table: insert-and-return, a
//! newest-first listing, and an exact row count for health probes. Rows are
//! append-only; there is no update or delete path.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::Post;

const TABLE: &str = "marketing_posts";

/// Store call errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Store returned no row for the insert")]
    MissingRow,

    #[error("Store response carried no row count")]
    MissingCount,

    #[error("Missing store credentials")]
    MissingCredentials,
}

#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    message: Option<String>,
}

/// PostgREST client over the hosted `marketing_posts` table.
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl StoreClient {
    /// Both the project URL and the anon key are required. The URL is
    /// injectable by construction, so tests point it at a local mock.
    pub fn new(store_url: String, api_key: String) -> Result<Self, StoreError> {
        if store_url.is_empty() || api_key.is_empty() {
            return Err(StoreError::MissingCredentials);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: store_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TABLE)
    }

    /// Append one row and return it as stored.
    pub async fn insert_post(&self, post: &Post) -> Result<Post, StoreError> {
        let response = self
            .client
            .post(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .json(post)
            .send()
            .await?;

        let response = Self::check(response).await?;

        // With return=representation the body is the singleton row array.
        let mut rows: Vec<Post> = response.json().await?;
        if rows.is_empty() {
            return Err(StoreError::MissingRow);
        }
        Ok(rows.remove(0))
    }

    /// List rows newest first, optionally bounded.
    pub async fn list_posts(&self, limit: Option<usize>) -> Result<Vec<Post>, StoreError> {
        let mut query = vec![
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "created_at.desc".to_string()),
        ];
        if let Some(limit) = limit {
            query.push(("limit".to_string(), limit.to_string()));
        }

        let response = self
            .client
            .get(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&query)
            .send()
            .await?;

        let response = Self::check(response).await?;

        Ok(response.json().await?)
    }

    /// Exact row count via a HEAD probe, parsed from `Content-Range`.
    pub async fn count_posts(&self) -> Result<u64, StoreError> {
        let response = self
            .client
            .head(self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "count=exact")
            .query(&[("select", "*")])
            .send()
            .await?;

        let response = Self::check(response).await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or(StoreError::MissingCount)
    }

    /// Decode the PostgREST error body on non-2xx responses.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StoreErrorBody>(&error_body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or(error_body);

        tracing::error!(status = status.as_u16(), message = %message, "Store API error");

        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// `Content-Range` comes back as `0-24/3573`, or `*/0` for an empty table.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

// ============================================================================
// TESTS
// ============================================================================
