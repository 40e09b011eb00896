//! `ContentItem` aggregate (§3): one normalized, deduplicated piece of raw
//! content collected from a source.

use chrono::{DateTime, Utc};
use common::domain::value_objects::AssetTag;
use common::versioned_aggregate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub source_url: Option<String>,
}

versioned_aggregate!(ContentItem, "content_items", {
    source_id: String,
    content_hash: String,
    raw_content: String,
    normalized_content: String,
    metadata: ContentMetadata,
    asset_tags: Vec<AssetTag>,
    collected_at: DateTime<Utc>
});

impl ContentItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        content_id: String,
        source_id: String,
        content_hash: String,
        raw_content: String,
        normalized_content: String,
        metadata: ContentMetadata,
        asset_tags: Vec<AssetTag>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: content_id,
            created_at: now,
            updated_at: now,
            version: 0,
            source_id,
            content_hash,
            raw_content,
            normalized_content,
            metadata,
            asset_tags,
            collected_at: now,
        }
    }
}
