//! Assembles the command bus and wires the event-driven saga that carries
//! one refinement from `RefinementStarted` through to `RefinementCompleted`
//! or `ContentRejected` (§4.5).
//!
//! Same split as the ingestion pipeline's wiring: [`bus::CommandBus`] is for
//! dispatch from outside this pipeline; the saga below is internal chaining
//! between stages and runs as direct handler calls. `ContentChunked`'s
//! fan-out to `EnrichChunk` is the one place this pipeline genuinely needs
//! concurrency — each chunk is enriched independently (§4.5: "for each
//! chunk in parallel").

use std::sync::Arc;

use bus::CommandBus;
use futures::future::join_all;

use crate::commands::{
    AddChunkToRefinement, ChunkContent, EnrichChunk, FinalizeRefinement, RerefineContent,
    StartRefinement,
};
use crate::events::{AllChunksProcessed, ContentChunked};
use crate::handlers;
use crate::services::RefinementServices;

/// Registers every external command handler. Call once; the result is
/// meant to be frozen behind an `Arc` and shared.
pub fn build_command_bus(services: &RefinementServices) -> CommandBus {
    let mut bus = CommandBus::new();

    macro_rules! reg {
        ($cmd:ty, $handler:path) => {
            let s = services.clone();
            bus.register::<$cmd, _, _>(move |cmd| {
                let s = s.clone();
                async move { $handler(&s, cmd).await }
            });
        };
    }

    reg!(StartRefinement, handlers::refinement::start_refinement);
    reg!(ChunkContent, handlers::refinement::chunk_content);
    reg!(EnrichChunk, handlers::refinement::enrich_chunk);
    reg!(AddChunkToRefinement, handlers::refinement::add_chunk_to_refinement);
    reg!(FinalizeRefinement, handlers::refinement::finalize_refinement);
    reg!(RerefineContent, handlers::refinement::rerefine_content);

    bus
}

/// Wires the saga glue onto `services.events`.
pub fn wire_saga(services: &RefinementServices, _command_bus: Arc<CommandBus>) {
    let event_bus = services.events.clone();

    {
        let s = services.clone();
        event_bus.subscribe::<ContentChunked, _, _>(move |evt| {
            let s = s.clone();
            async move { fan_out_enrichment(&s, evt).await }
        });
    }

    {
        let s = services.clone();
        event_bus.subscribe::<AllChunksProcessed, _, _>(move |evt| {
            let s = s.clone();
            async move {
                handlers::refinement::finalize_refinement(
                    &s,
                    FinalizeRefinement {
                        refinement_id: evt.refinement_id,
                        total_chunks: evt.total_chunks,
                        valid_chunks: evt.valid_chunks,
                    },
                )
                .await
            }
        });
    }
}

/// Runs `EnrichChunk` for every chunk concurrently. Each chunk's result is
/// independent (quality scoring, tally update, event publication all live
/// inside `enrich_chunk` itself), so a failure enriching one chunk never
/// blocks the others — it only shows up as that chunk's own
/// `ChunkEnrichmentFailed`.
async fn fan_out_enrichment(
    services: &RefinementServices,
    evt: ContentChunked,
) -> Result<(), common::error::AppError> {
    let total = evt.chunk_count;
    let tasks = evt.chunks.into_iter().map(|chunk| {
        let services = services.clone();
        let refinement_id = evt.refinement_id.clone();
        let content_item_id = evt.content_item_id.clone();
        let published_at = evt.published_at;
        async move {
            let chunk_index = chunk.index();
            if let Err(err) = handlers::refinement::enrich_chunk(
                &services,
                EnrichChunk {
                    refinement_id: refinement_id.clone(),
                    content_item_id,
                    chunk_id: chunk.id,
                    chunk_content: chunk.content,
                    chunk_hash: chunk.hash,
                    chunk_position: chunk.position,
                    previous_chunk_id: chunk.previous_chunk_id,
                    next_chunk_id: chunk.next_chunk_id,
                    total_chunks: total,
                    published_at,
                    quality_threshold: services.config.quality_threshold,
                },
            )
            .await
            {
                tracing::error!(
                    refinement_id = %refinement_id,
                    chunk_index,
                    error = %err,
                    "failed to enrich chunk"
                );
            }
        }
    });

    join_all(tasks).await;
    Ok(())
}
