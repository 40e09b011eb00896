//! Duplicate detection (§4.4): exact match on `contentHash`. The
//! authoritative check is the store's unique index on `content_hash`; an
//! in-memory seen-hash cache is kept only as an advisory fast path (§5 —
//! "authoritative check remains in the store").

use std::collections::HashSet;
use std::sync::Mutex;

use common::error::AppError;
use common::storage::db::SurrealDbClient;

use crate::domain::ContentItem;

#[derive(Default)]
pub struct DedupCache {
    seen: Mutex<HashSet<String>>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn might_contain(&self, content_hash: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(content_hash)
    }

    pub fn record(&self, content_hash: &str) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(content_hash.to_string());
    }
}

/// Authoritative duplicate check against the `content_items` store.
pub async fn find_by_content_hash(
    db: &SurrealDbClient,
    content_hash: &str,
) -> Result<Option<ContentItem>, AppError> {
    let mut response = db
        .client
        .query("SELECT * FROM content_items WHERE content_hash = $hash LIMIT 1")
        .bind(("hash", content_hash.to_string()))
        .await?;
    let items: Vec<ContentItem> = response.take(0)?;
    Ok(items.into_iter().next())
}
