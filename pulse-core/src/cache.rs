//! Local fallback cache.
//!
//! One JSON array of Post records, newest first, at a well-known path
//! (default `~/.pulse/library.json`). This is the read tier when the server
//! is down and the write tier when analysis ran client-direct. A missing
//! file is an empty library; an unreadable file is logged and treated as
//! empty rather than wedging every fallback read.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::Post;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append-at-front JSON file store.
///
/// Writes are read-then-overwrite and not atomic. Concurrent writers can
/// race; this is a single-user client cache.
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached library, newest first. Missing file means an empty
    /// library, not an error.
    pub fn read_posts(&self) -> Result<Vec<Post>, CacheError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::Io(e)),
        };

        match serde_json::from_str(&raw) {
            Ok(posts) => Ok(posts),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Fallback cache is unreadable, treating it as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Insert one post at the front and persist the whole array.
    pub fn prepend_post(&self, post: &Post) -> Result<(), CacheError> {
        let mut posts = self.read_posts()?;
        posts.insert(0, post.clone());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let body = serde_json::to_string_pretty(&posts)?;
        fs::write(&self.path, body)?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Topic;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_post(title: &str) -> Post {
        Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            url: None,
            primary_topic: Topic::Copywriting,
            secondary_topics: vec![],
            core_takeaway: "t".to_string(),
            summary: vec![],
            key_insights: vec![],
            original_text: "o".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn missing_file_reads_as_empty_library() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().join("library.json"));

        assert!(cache.read_posts().unwrap().is_empty());
    }

    #[test]
    fn prepend_keeps_newest_first_order() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().join("library.json"));

        cache.prepend_post(&sample_post("first")).unwrap();
        cache.prepend_post(&sample_post("second")).unwrap();
        cache.prepend_post(&sample_post("third")).unwrap();

        let posts = cache.read_posts().unwrap();
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].title, "third");
        assert_eq!(posts[2].title, "first");
    }

    #[test]
    fn prepend_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let cache = LocalCache::new(dir.path().join("nested/deeper/library.json"));

        cache.prepend_post(&sample_post("p")).unwrap();

        assert_eq!(cache.read_posts().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_file_reads_as_empty_and_is_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        fs::write(&path, "{not valid json").unwrap();

        let cache = LocalCache::new(&path);
        assert!(cache.read_posts().unwrap().is_empty());

        cache.prepend_post(&sample_post("fresh")).unwrap();
        let posts = cache.read_posts().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "fresh");
    }
}
