//! Cross-pipeline wiring (§2): the one subscription that isn't internal to
//! either pipeline's own saga, so it lives at the composition root rather
//! than inside `ingestion-pipeline` or `refinement-pipeline`.
//!
//! `ContentIngested` carries the payload `StartRefinement` needs
//! (§9 "event-carried state transfer"), so the bridge never has to round-trip
//! the store for it.

use std::sync::Arc;

use bus::{CommandBus, EventBus};
use ingestion_pipeline::events::ContentIngested;
use refinement_pipeline::commands::StartRefinement;

pub fn wire_ingestion_to_refinement(
    ingestion_events: &EventBus,
    refinement_commands: Arc<CommandBus>,
) {
    ingestion_events.subscribe::<ContentIngested, _, _>(move |evt| {
        let refinement_commands = refinement_commands.clone();
        async move {
            refinement_commands
                .execute(StartRefinement {
                    content_item_id: evt.content_id,
                    normalized_content: evt.normalized_content,
                    published_at: evt.published_at,
                })
                .await
                .map(|_refinement_id| ())
        }
    });
}
