//! Handlers for `StartRefinement`, `ChunkContent`, `EnrichChunk`,
//! `AddChunkToRefinement`, `FinalizeRefinement`, `RerefineContent` (§4.5).

use common::concurrency::retry_on_concurrency;
use common::error::AppError;
use common::ports::nlp::QualityAnalysisInput;
use chrono::Utc;
use uuid::Uuid;

use crate::chunking;
use crate::commands::{
    AddChunkToRefinement, ChunkContent, EnrichChunk, FinalizeRefinement, RerefineContent,
    StartRefinement,
};
use crate::domain::{ContentRefinement, RefinementChunk};
use crate::events::{
    AllChunksProcessed, ChunkDescriptor, ChunkEnriched, ChunkEnrichmentFailed, ContentChunked,
    ContentRejected, RefinementCompleted, RefinementFailed, RefinementStarted,
};
use crate::services::RefinementServices;
use crate::tally::{self, ChunkTally};

/// Creates a new `Pending` refinement and immediately proceeds to chunking
/// (§4.5: `StartRefinement` has no separate "awaiting chunking" pause).
pub async fn start_refinement(
    services: &RefinementServices,
    cmd: StartRefinement,
) -> Result<String, AppError> {
    start_refinement_inner(services, cmd, None).await
}

async fn start_refinement_inner(
    services: &RefinementServices,
    cmd: StartRefinement,
    previous_refinement_id: Option<String>,
) -> Result<String, AppError> {
    let refinement_id = Uuid::new_v4().to_string();
    let refinement = ContentRefinement::start(
        refinement_id.clone(),
        cmd.content_item_id.clone(),
        previous_refinement_id,
    );
    services.db.create_aggregate(&refinement).await?;

    services
        .events
        .publish(RefinementStarted {
            refinement_id: refinement_id.clone(),
            content_item_id: cmd.content_item_id.clone(),
        })
        .await;

    chunk_content(
        services,
        ChunkContent {
            refinement_id: refinement_id.clone(),
            content_item_id: cmd.content_item_id,
            normalized_content: cmd.normalized_content,
            published_at: cmd.published_at,
        },
    )
    .await?;

    Ok(refinement_id)
}

/// Splits the content, records the fan-in tally and `ContentChunked`. A
/// chunk count of zero (empty content) skips straight to completion — no
/// `ChunkEnriched` will ever arrive to drive it there. A hard chunking
/// failure (invalid configuration) fails the refinement outright rather
/// than leaving it stuck `Pending`.
pub async fn chunk_content(services: &RefinementServices, cmd: ChunkContent) -> Result<(), AppError> {
    let mut refinement: ContentRefinement = services
        .db
        .load_aggregate(&cmd.refinement_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            kind: "content_refinement",
            id: cmd.refinement_id.clone(),
        })?;

    let chunks = match chunking::chunk_content(
        &cmd.normalized_content,
        &services.config,
        services.hasher.as_ref(),
    ) {
        Ok(chunks) => chunks,
        Err(err) => {
            if refinement.fail(err.to_string()) {
                services.db.save_aggregate(&mut refinement).await?;
                services
                    .events
                    .publish(RefinementFailed {
                        refinement_id: cmd.refinement_id.clone(),
                        content_item_id: cmd.content_item_id.clone(),
                        error: err.to_string(),
                    })
                    .await;
            }
            return Err(err);
        }
    };
    let total = chunks.len() as u32;

    refinement.mark_chunked(total)?;
    services.db.save_aggregate(&mut refinement).await?;

    // The tally row must exist before ContentChunked is published: that
    // publish synchronously drives fan-out enrichment all the way to
    // `tally::record_chunk_result`, which only updates an existing row
    // (§4.7's CAS write path never creates rows on a miss).
    if total > 0 {
        tally::init_tally(&services.db, &cmd.refinement_id, total).await?;
    }

    services
        .events
        .publish(ContentChunked {
            refinement_id: cmd.refinement_id.clone(),
            content_item_id: cmd.content_item_id.clone(),
            chunk_count: total,
            chunks: chunks
                .iter()
                .map(|c| ChunkDescriptor {
                    id: c.id.clone(),
                    content: c.content.clone(),
                    hash: c.hash.clone(),
                    position: c.position,
                    previous_chunk_id: c.previous_chunk_id.clone(),
                    next_chunk_id: c.next_chunk_id.clone(),
                })
                .collect(),
            published_at: cmd.published_at,
        })
        .await;

    if total == 0 {
        services
            .events
            .publish(AllChunksProcessed {
                refinement_id: cmd.refinement_id,
                total_chunks: 0,
                valid_chunks: 0,
            })
            .await;
    }

    Ok(())
}

/// Extracts entities, temporal context, and a quality score for one chunk.
/// A hard failure of any port emits `ChunkEnrichmentFailed`; a quality
/// score below `quality_threshold` emits `ChunkEnriched` with
/// `passed_quality_threshold: false`. Either way the chunk counts toward
/// the tally but is never attached to the aggregate (§4.5).
pub async fn enrich_chunk(services: &RefinementServices, cmd: EnrichChunk) -> Result<bool, AppError> {
    match run_enrichment(services, &cmd).await {
        Ok((chunk, passed)) => {
            if passed {
                add_chunk_to_refinement(
                    services,
                    AddChunkToRefinement {
                        refinement_id: cmd.refinement_id.clone(),
                        chunk,
                    },
                )
                .await?;
            }
            let tally = tally::record_chunk_result(&services.db, &cmd.refinement_id, passed).await?;
            services
                .events
                .publish(ChunkEnriched {
                    refinement_id: cmd.refinement_id.clone(),
                    content_item_id: cmd.content_item_id.clone(),
                    chunk_index: cmd.chunk_position.index as u32,
                    total_chunks: cmd.total_chunks,
                    passed_quality_threshold: passed,
                })
                .await;
            maybe_publish_all_processed(services, &tally).await;
            Ok(passed)
        }
        Err(err) => {
            let tally = tally::record_chunk_result(&services.db, &cmd.refinement_id, false).await?;
            services
                .events
                .publish(ChunkEnrichmentFailed {
                    refinement_id: cmd.refinement_id.clone(),
                    content_item_id: cmd.content_item_id.clone(),
                    chunk_index: cmd.chunk_position.index as u32,
                    total_chunks: cmd.total_chunks,
                    error: err.to_string(),
                })
                .await;
            maybe_publish_all_processed(services, &tally).await;
            Ok(false)
        }
    }
}

/// Runs each NLP port call through the shared breaker + retry (§5: "every
/// external call ... runs under a deadline ... counted as a failure for
/// retry/breaker/health"), the same guard `fetch_content` puts around the
/// source adapter.
async fn run_enrichment(
    services: &RefinementServices,
    cmd: &EnrichChunk,
) -> Result<(RefinementChunk, bool), AppError> {
    let content = cmd.chunk_content.clone();
    let entities = services
        .nlp_breaker
        .call(|| async {
            resilience::retry_execute(&services.retry_config, || async {
                services.entity_extractor.extract(&content).await
            })
            .await
            .into_result()
        })
        .await?;

    let published_at = cmd.published_at.unwrap_or_else(Utc::now);
    let content = cmd.chunk_content.clone();
    let temporal_context = services
        .nlp_breaker
        .call(|| async {
            resilience::retry_execute(&services.retry_config, || async {
                services.temporal_extractor.extract(&content, published_at).await
            })
            .await
            .into_result()
        })
        .await?;

    let token_count = cmd.chunk_content.chars().count() / services.config.chars_per_token.max(1);
    let content = cmd.chunk_content.clone();
    let entities_snapshot = entities.clone();
    let quality = services
        .nlp_breaker
        .call(|| async {
            resilience::retry_execute(&services.retry_config, || async {
                services
                    .quality_analyzer
                    .analyze(
                        &content,
                        QualityAnalysisInput {
                            token_count,
                            entities: &entities_snapshot,
                            published_at,
                        },
                    )
                    .await
            })
            .await
            .into_result()
        })
        .await?;

    let passed = quality.overall >= cmd.quality_threshold;
    Ok((
        RefinementChunk {
            chunk_id: cmd.chunk_id.clone(),
            content: cmd.chunk_content.clone(),
            hash: cmd.chunk_hash.clone(),
            position: cmd.chunk_position,
            previous_chunk_id: cmd.previous_chunk_id.clone(),
            next_chunk_id: cmd.next_chunk_id.clone(),
            entities,
            temporal_context,
            quality,
        },
        passed,
    ))
}

async fn maybe_publish_all_processed(services: &RefinementServices, tally: &ChunkTally) {
    if tally.is_complete() {
        services
            .events
            .publish(AllChunksProcessed {
                refinement_id: tally.refinement_id.clone(),
                total_chunks: tally.total,
                valid_chunks: tally.valid,
            })
            .await;
    }
}

pub async fn add_chunk_to_refinement(
    services: &RefinementServices,
    cmd: AddChunkToRefinement,
) -> Result<(), AppError> {
    retry_on_concurrency(&services.concurrency_retry_config, || async {
        let mut refinement: ContentRefinement = services
            .db
            .load_aggregate(&cmd.refinement_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                kind: "content_refinement",
                id: cmd.refinement_id.clone(),
            })?;
        refinement.add_chunk(cmd.chunk.clone())?;
        services.db.save_aggregate(&mut refinement).await
    })
    .await
}

/// Idempotent: re-entry on an already-terminal refinement is a no-op
/// (§4.5, concurrent `AllChunksProcessed` delivery).
pub async fn finalize_refinement(
    services: &RefinementServices,
    cmd: FinalizeRefinement,
) -> Result<(), AppError> {
    let outcome = retry_on_concurrency(&services.concurrency_retry_config, || async {
        let mut refinement: ContentRefinement = services
            .db
            .load_aggregate(&cmd.refinement_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                kind: "content_refinement",
                id: cmd.refinement_id.clone(),
            })?;

        let (changed, rejected) = if cmd.valid_chunks == 0 {
            (refinement.reject("No valid chunks after quality filtering"), true)
        } else {
            (refinement.complete(), false)
        };

        if changed {
            services.db.save_aggregate(&mut refinement).await?;
        }
        Ok((changed, rejected, refinement.content_item_id.clone()))
    })
    .await?;

    let (transitioned, rejected, content_item_id) = outcome;
    if !transitioned {
        return Ok(());
    }

    if rejected {
        services
            .events
            .publish(ContentRejected {
                refinement_id: cmd.refinement_id,
                content_item_id,
                reason: "No valid chunks after quality filtering".to_string(),
            })
            .await;
    } else {
        services
            .events
            .publish(RefinementCompleted {
                refinement_id: cmd.refinement_id,
                content_item_id,
                valid_chunk_count: cmd.valid_chunks,
            })
            .await;
    }
    Ok(())
}

/// Archives any non-terminal refinement for the content item, then starts
/// a fresh one linked to it (§4.5: "only one non-terminal refinement per
/// content item may exist at a time").
pub async fn rerefine_content(
    services: &RefinementServices,
    cmd: RerefineContent,
) -> Result<String, AppError> {
    let previous_id = if let Some(mut previous) =
        crate::domain::content_refinement::find_active_refinement_by_content_item(
            &services.db,
            &cmd.content_item_id,
        )
        .await?
    {
        previous.archive()?;
        services.db.save_aggregate(&mut previous).await?;
        Some(previous.id.clone())
    } else {
        None
    };

    start_refinement_inner(
        services,
        StartRefinement {
            content_item_id: cmd.content_item_id,
            normalized_content: cmd.normalized_content,
            published_at: None,
        },
        previous_id,
    )
    .await
}
