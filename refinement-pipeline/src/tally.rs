//! `refinement_chunk_tallies` fan-in (§4.5): a strong-consistent counter,
//! one row per refinement, incremented atomically by an `UPDATE ...
//! RETURNING` so concurrent `ChunkEnriched` delivery can never double- or
//! lose-count toward `AllChunksProcessed` — the same atomic-update shape
//! the teacher uses for embedding writebacks.

use common::error::AppError;
use common::storage::db::SurrealDbClient;
use serde::{Deserialize, Serialize};

const TALLY_TABLE: &str = "refinement_chunk_tallies";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkTally {
    pub refinement_id: String,
    pub processed: u32,
    pub valid: u32,
    pub total: u32,
}

impl ChunkTally {
    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Creates the tally row for a newly-chunked refinement. Must run once,
/// before any `ChunkEnriched` can be recorded against it.
pub async fn init_tally(
    db: &SurrealDbClient,
    refinement_id: &str,
    total: u32,
) -> Result<(), AppError> {
    let tally = ChunkTally {
        refinement_id: refinement_id.to_string(),
        processed: 0,
        valid: 0,
        total,
    };
    db.client
        .create::<Option<ChunkTally>>((TALLY_TABLE, refinement_id))
        .content(tally)
        .await
        .map_err(AppError::Database)?;
    Ok(())
}

/// Atomically increments `processed` (always) and `valid` (iff `passed`),
/// returning the post-increment tally.
pub async fn record_chunk_result(
    db: &SurrealDbClient,
    refinement_id: &str,
    passed: bool,
) -> Result<ChunkTally, AppError> {
    let delta_valid = u32::from(passed);
    let mut response = db
        .client
        .query(
            "UPDATE type::thing($tb, $id) SET processed = processed + 1, valid = valid + $delta_valid RETURN AFTER",
        )
        .bind(("tb", TALLY_TABLE))
        .bind(("id", refinement_id.to_string()))
        .bind(("delta_valid", delta_valid))
        .await
        .map_err(AppError::Database)?;

    let rows: Vec<ChunkTally> = response.take(0).map_err(AppError::Database)?;
    rows.into_iter().next().ok_or_else(|| AppError::NotFound {
        kind: "refinement_chunk_tally",
        id: refinement_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn memory_db() -> SurrealDbClient {
        let namespace = "test_ns";
        let database = Uuid::new_v4().to_string();
        SurrealDbClient::memory(namespace, &database)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn records_accumulate_and_report_completion() {
        let db = memory_db().await;
        init_tally(&db, "ref-1", 2).await.unwrap();

        let first = record_chunk_result(&db, "ref-1", true).await.unwrap();
        assert_eq!(first.processed, 1);
        assert_eq!(first.valid, 1);
        assert!(!first.is_complete());

        let second = record_chunk_result(&db, "ref-1", false).await.unwrap();
        assert_eq!(second.processed, 2);
        assert_eq!(second.valid, 1);
        assert!(second.is_complete());
    }
}
