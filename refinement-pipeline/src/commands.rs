//! Command set for the refinement pipeline (§4.5).

use chrono::{DateTime, Utc};
use common::domain::value_objects::ChunkPosition;

use crate::domain::RefinementChunk;

pub struct StartRefinement {
    pub content_item_id: String,
    pub normalized_content: String,
    pub published_at: Option<DateTime<Utc>>,
}
impl bus::Command for StartRefinement {
    type Result = String;
}

pub struct ChunkContent {
    pub refinement_id: String,
    pub content_item_id: String,
    pub normalized_content: String,
    pub published_at: Option<DateTime<Utc>>,
}
impl bus::Command for ChunkContent {
    type Result = ();
}

pub struct EnrichChunk {
    pub refinement_id: String,
    pub content_item_id: String,
    pub chunk_id: String,
    pub chunk_content: String,
    pub chunk_hash: String,
    pub chunk_position: ChunkPosition,
    pub previous_chunk_id: Option<String>,
    pub next_chunk_id: Option<String>,
    pub total_chunks: u32,
    pub published_at: Option<DateTime<Utc>>,
    pub quality_threshold: f64,
}
impl bus::Command for EnrichChunk {
    type Result = bool;
}

pub struct AddChunkToRefinement {
    pub refinement_id: String,
    pub chunk: RefinementChunk,
}
impl bus::Command for AddChunkToRefinement {
    type Result = ();
}

pub struct FinalizeRefinement {
    pub refinement_id: String,
    pub total_chunks: u32,
    pub valid_chunks: u32,
}
impl bus::Command for FinalizeRefinement {
    type Result = ();
}

pub struct RerefineContent {
    pub content_item_id: String,
    pub normalized_content: String,
    pub reason: String,
}
impl bus::Command for RerefineContent {
    type Result = String;
}
