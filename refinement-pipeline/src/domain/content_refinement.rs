//! `ContentRefinement` aggregate (§3, §4.5): one chunking + enrichment pass
//! over a `ContentItem`, terminating in `Completed` (valid chunks attached)
//! or `Rejected` (none survived quality filtering).

use chrono::{DateTime, Utc};
use common::domain::value_objects::{ChunkPosition, CryptoEntity, QualityScore, TemporalContext};
use common::error::AppError;
use common::versioned_aggregate;
use serde::{Deserialize, Serialize};

/// §3's `{pending, processing, completed, failed, rejected}`, plus
/// `Archived` for a refinement superseded by re-refinement. Chunking and
/// enrichment are both covered by `Enriching` (the single non-terminal
/// "processing" state) — chunking happens synchronously within the
/// command that starts enrichment, so there is no observable state
/// in between worth a variant of its own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RefinementStatus {
    Pending,
    Enriching,
    Completed,
    Failed,
    Rejected,
    Archived,
}

impl RefinementStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Rejected | Self::Archived
        )
    }
}

/// A Chunk entity (§3): identity `chunk_id`, a content `hash` for
/// integrity/dedup, a `position` within the refinement's normalized
/// content, and `previous_chunk_id`/`next_chunk_id` forming a
/// doubly-linked chain matching `position.index` order (§8).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefinementChunk {
    pub chunk_id: String,
    pub content: String,
    pub hash: String,
    pub position: ChunkPosition,
    pub previous_chunk_id: Option<String>,
    pub next_chunk_id: Option<String>,
    pub entities: Vec<CryptoEntity>,
    pub temporal_context: Option<TemporalContext>,
    pub quality: QualityScore,
}

impl RefinementChunk {
    pub fn index(&self) -> u32 {
        self.position.index as u32
    }
}

versioned_aggregate!(ContentRefinement, "content_refinements", {
    content_item_id: String,
    status: RefinementStatus,
    total_chunks: Option<u32>,
    chunks: Vec<RefinementChunk>,
    previous_refinement_id: Option<String>,
    rejection_reason: Option<String>,
    error: Option<String>,
    completed_at: Option<DateTime<Utc>>
});

impl ContentRefinement {
    pub fn start(
        refinement_id: String,
        content_item_id: String,
        previous_refinement_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: refinement_id,
            created_at: now,
            updated_at: now,
            version: 0,
            content_item_id,
            status: RefinementStatus::Pending,
            total_chunks: None,
            chunks: Vec::new(),
            previous_refinement_id,
            rejection_reason: None,
            error: None,
            completed_at: None,
        }
    }

    pub fn mark_chunked(&mut self, total_chunks: u32) -> Result<(), AppError> {
        if self.status != RefinementStatus::Pending {
            return Err(AppError::InvariantViolation(format!(
                "refinement {} is not PENDING",
                self.id
            )));
        }
        self.status = RefinementStatus::Enriching;
        self.total_chunks = Some(total_chunks);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Hard failure (e.g. chunking rejected the content outright), as
    /// opposed to `reject`'s quality-filtering outcome. Idempotent like
    /// `complete`/`reject`: a re-entry on an already-terminal refinement
    /// is a no-op.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = RefinementStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        true
    }

    pub fn add_chunk(&mut self, chunk: RefinementChunk) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::InvariantViolation(format!(
                "refinement {} is terminal",
                self.id
            )));
        }
        self.chunks.push(chunk);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Idempotent: re-entry on an already-terminal refinement is a no-op
    /// (§4.5, concurrent `AllChunksProcessed` delivery).
    pub fn complete(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = RefinementStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        true
    }

    pub fn reject(&mut self, reason: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = RefinementStatus::Rejected;
        self.rejection_reason = Some(reason.into());
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        true
    }

    pub fn archive(&mut self) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::InvariantViolation(format!(
                "refinement {} is already terminal",
                self.id
            )));
        }
        self.status = RefinementStatus::Archived;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Finds the one non-terminal refinement for a content item, if any
/// (§4.5: "only one non-terminal refinement per content item may exist at
/// a time"). Used by re-refinement to locate what to archive.
pub async fn find_active_refinement_by_content_item(
    db: &common::storage::db::SurrealDbClient,
    content_item_id: &str,
) -> Result<Option<ContentRefinement>, AppError> {
    let mut response = db
        .client
        .query(
            "SELECT * FROM content_refinements \
             WHERE content_item_id = $id AND status NOT IN ['COMPLETED', 'FAILED', 'REJECTED', 'ARCHIVED'] \
             LIMIT 1",
        )
        .bind(("id", content_item_id.to_string()))
        .await
        .map_err(AppError::Database)?;
    let refinements: Vec<ContentRefinement> = response.take(0).map_err(AppError::Database)?;
    Ok(refinements.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> ContentRefinement {
        ContentRefinement::start("ref-1".to_string(), "content-1".to_string(), None)
    }

    #[test]
    fn start_is_pending_at_version_zero() {
        let refinement = pending();
        assert_eq!(refinement.status, RefinementStatus::Pending);
        assert_eq!(refinement.version, 0);
    }

    #[test]
    fn mark_chunked_requires_pending() {
        let mut refinement = pending();
        refinement.mark_chunked(3).unwrap();
        assert_eq!(refinement.status, RefinementStatus::Enriching);
        assert!(refinement.mark_chunked(3).is_err());
    }

    #[test]
    fn complete_is_idempotent_on_a_terminal_refinement() {
        let mut refinement = pending();
        refinement.mark_chunked(1).unwrap();
        assert!(refinement.complete());
        assert!(!refinement.complete());
        assert_eq!(refinement.status, RefinementStatus::Completed);
    }

    #[test]
    fn reject_records_a_reason_once() {
        let mut refinement = pending();
        refinement.mark_chunked(1).unwrap();
        assert!(refinement.reject("No valid chunks after quality filtering"));
        assert!(!refinement.reject("ignored"));
        assert_eq!(
            refinement.rejection_reason.as_deref(),
            Some("No valid chunks after quality filtering")
        );
    }

    #[test]
    fn archive_rejects_an_already_terminal_refinement() {
        let mut refinement = pending();
        refinement.mark_chunked(1).unwrap();
        refinement.complete();
        assert!(refinement.archive().is_err());
    }

    #[test]
    fn fail_records_an_error_once() {
        let mut refinement = pending();
        assert!(refinement.fail("invalid chunk configuration"));
        assert!(!refinement.fail("ignored"));
        assert_eq!(refinement.status, RefinementStatus::Failed);
        assert_eq!(refinement.error.as_deref(), Some("invalid chunk configuration"));
    }
}
