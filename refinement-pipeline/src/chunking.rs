//! Chunking contract (§4.5): a contiguous, overlap-preserving split of
//! normalized content into token-equivalent-sized pieces, `chars_per_token`
//! chars per token (default 4, §1 ambient config).

use common::domain::value_objects::ChunkPosition;
use common::error::AppError;
use common::ports::hash::Hash;
use common::utils::config::RefinementConfig;
use text_splitter::{ChunkConfig, TextSplitter};
use uuid::Uuid;

pub struct Chunk {
    pub id: String,
    pub content: String,
    pub hash: String,
    pub position: ChunkPosition,
    pub previous_chunk_id: Option<String>,
    pub next_chunk_id: Option<String>,
}

impl Chunk {
    pub fn index(&self) -> u32 {
        self.position.index as u32
    }
}

/// Splits `content` per `config`. Chunks are contiguous and their union
/// covers the entire input; adjacent chunks may overlap by
/// `chunk_overlap_tokens` tokens (§4.5). Each chunk's offsets are located
/// by scanning forward from the previous chunk's start, so overlapping
/// occurrences of identical text still resolve to non-decreasing
/// positions; `previousChunkId`/`nextChunkId` form a doubly-linked chain
/// matching index order (§8).
pub fn chunk_content(
    content: &str,
    config: &RefinementConfig,
    hasher: &dyn Hash,
) -> Result<Vec<Chunk>, AppError> {
    let max_characters = config
        .chunk_size_tokens
        .saturating_mul(config.chars_per_token);
    let overlap = config
        .chunk_overlap_tokens
        .saturating_mul(config.chars_per_token);

    let chunk_config = ChunkConfig::new(max_characters)
        .with_overlap(overlap)
        .map_err(|err| AppError::Validation(format!("invalid chunk configuration: {err}")))?;
    let splitter = TextSplitter::new(chunk_config);

    let mut chunks = Vec::new();
    let mut search_from = 0usize;
    for (index, piece) in splitter.chunks(content).enumerate() {
        let found = content[search_from..].find(piece).ok_or_else(|| {
            AppError::InvariantViolation(format!(
                "chunk {index} text not found in source content at or after offset {search_from}"
            ))
        })?;
        let start_offset = search_from + found;
        let end_offset = start_offset + piece.len();
        search_from = start_offset + 1;

        let position = ChunkPosition::new(index, start_offset, end_offset)?;
        chunks.push(Chunk {
            id: Uuid::new_v4().to_string(),
            content: piece.to_string(),
            hash: hasher.sha256(piece),
            position,
            previous_chunk_id: None,
            next_chunk_id: None,
        });
    }

    for i in 0..chunks.len() {
        let previous_chunk_id = if i > 0 { Some(chunks[i - 1].id.clone()) } else { None };
        let next_chunk_id = chunks.get(i + 1).map(|c| c.id.clone());
        chunks[i].previous_chunk_id = previous_chunk_id;
        chunks[i].next_chunk_id = next_chunk_id;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use common::ports::hash::Sha256Hasher;

    use super::*;

    fn config() -> RefinementConfig {
        RefinementConfig {
            chunk_size_tokens: 10,
            chunk_overlap_tokens: 2,
            quality_threshold: 0.3,
            chars_per_token: 4,
        }
    }

    #[test]
    fn short_content_produces_a_single_chunk() {
        let chunks = chunk_content("a short sentence", &config(), &Sha256Hasher).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index(), 0);
        assert_eq!(chunks[0].hash.len(), 64);
        assert!(chunks[0].previous_chunk_id.is_none());
        assert!(chunks[0].next_chunk_id.is_none());
    }

    #[test]
    fn long_content_splits_into_multiple_contiguous_chunks_with_linked_ids() {
        let content = "word ".repeat(200);
        let chunks = chunk_content(&content, &config(), &Sha256Hasher).unwrap();
        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index(), i as u32);
            assert_eq!(chunk.position.index, i);
        }
        assert!(chunks[0].previous_chunk_id.is_none());
        assert_eq!(chunks[0].next_chunk_id.as_deref(), Some(chunks[1].id.as_str()));
        assert_eq!(
            chunks[1].previous_chunk_id.as_deref(),
            Some(chunks[0].id.as_str())
        );
        assert!(chunks.last().unwrap().next_chunk_id.is_none());
    }

    #[test]
    fn chunk_offsets_are_contiguous_and_non_decreasing() {
        let content = "word ".repeat(200);
        let chunks = chunk_content(&content, &config(), &Sha256Hasher).unwrap();
        for pair in chunks.windows(2) {
            assert!(pair[1].position.start_offset >= pair[0].position.start_offset);
        }
    }

    #[test]
    fn empty_content_produces_no_chunks() {
        let chunks = chunk_content("", &config(), &Sha256Hasher).unwrap();
        assert!(chunks.is_empty());
    }
}
