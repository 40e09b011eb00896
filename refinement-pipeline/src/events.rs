//! Events emitted by the refinement pipeline (§4.5).

use chrono::{DateTime, Utc};
use common::domain::value_objects::ChunkPosition;

macro_rules! event {
    ($name:ident { $($field:ident: $ty:ty),* $(,)? }) => {
        #[derive(Clone, Debug)]
        pub struct $name {
            $(pub $field: $ty),*
        }
        impl bus::Event for $name {}
    };
}

event!(RefinementStarted {
    refinement_id: String,
    content_item_id: String,
});

#[derive(Clone, Debug)]
pub struct ChunkDescriptor {
    pub id: String,
    pub content: String,
    pub hash: String,
    pub position: ChunkPosition,
    pub previous_chunk_id: Option<String>,
    pub next_chunk_id: Option<String>,
}

impl ChunkDescriptor {
    pub fn index(&self) -> u32 {
        self.position.index as u32
    }
}

event!(ContentChunked {
    refinement_id: String,
    content_item_id: String,
    chunk_count: u32,
    chunks: Vec<ChunkDescriptor>,
    published_at: Option<DateTime<Utc>>,
});

event!(ChunkEnriched {
    refinement_id: String,
    content_item_id: String,
    chunk_index: u32,
    total_chunks: u32,
    passed_quality_threshold: bool,
});

event!(ChunkEnrichmentFailed {
    refinement_id: String,
    content_item_id: String,
    chunk_index: u32,
    total_chunks: u32,
    error: String,
});

event!(AllChunksProcessed {
    refinement_id: String,
    total_chunks: u32,
    valid_chunks: u32,
});

event!(RefinementCompleted {
    refinement_id: String,
    content_item_id: String,
    valid_chunk_count: u32,
});

event!(ContentRejected {
    refinement_id: String,
    content_item_id: String,
    reason: String,
});

event!(RefinementFailed {
    refinement_id: String,
    content_item_id: String,
    error: String,
});
