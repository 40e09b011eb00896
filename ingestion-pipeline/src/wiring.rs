//! Assembles the command bus and wires the event-driven saga that carries
//! one piece of content from `ContentCollected` through to `ContentIngested`
//! (§2, §4.4).
//!
//! [`bus::CommandBus`] is for dispatch from outside the pipeline (a
//! scheduler tick, the CLI, an API handler); it is built once, fully
//! mutably, and frozen behind an `Arc`. The saga below is internal chaining
//! between the pipeline's own stages and is expressed as direct handler
//! calls rather than round-tripping through the command bus, since nothing
//! outside the pipeline ever needs to intercept `NormalizeContent` or
//! `DetectDuplicate` on their own.

use std::sync::Arc;

use bus::CommandBus;
use common::error::AppError;

use crate::commands::{
    CompleteJob, ConfigureSource, DeleteSource, FailJob, FetchContent, ScheduleJob, StartJob,
    UpdateJobMetrics, UpdateSourceHealth,
};
use crate::domain::JobMetrics;
use crate::events::{
    ContentCollected, ContentValidationFailed, JobCompleted, JobFailed, JobScheduled, JobStarted,
    SourceUnhealthy,
};
use crate::handlers;
use crate::services::PipelineServices;

/// Registers every external command handler. Call once; the result is
/// meant to be frozen behind an `Arc` and shared.
pub fn build_command_bus(services: &PipelineServices) -> CommandBus {
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

    reg!(ScheduleJob, handlers::job::schedule_job);
    reg!(StartJob, handlers::job::start_job);
    reg!(FetchContent, handlers::job::fetch_content);
    reg!(UpdateJobMetrics, handlers::job::update_job_metrics);
    reg!(CompleteJob, handlers::job::complete_job);
    reg!(FailJob, handlers::job::fail_job);
    reg!(ConfigureSource, handlers::source::configure_source);
    reg!(DeleteSource, handlers::source::delete_source);
    reg!(UpdateSourceHealth, handlers::source::update_source_health);

    bus
}

/// Wires the saga glue onto `services.events`. `services.events` must
/// already be the `Arc<EventBus>` this same saga will publish further
/// events onto (see [`bus::EventBus`]'s doc comment for why that bus alone,
/// unlike the command bus, accepts subscriptions through a shared
/// reference).
pub fn wire_saga(services: &PipelineServices, command_bus: Arc<CommandBus>) {
    let event_bus = services.events.clone();

    // JobScheduled only records a PENDING job; the actual StartJob dispatch
    // is registered on the in-memory scheduler to fire at `fire_at`, not run
    // inline, so a job scheduled for the future doesn't start immediately.
    {
        let bus = command_bus.clone();
        let scheduler = services.scheduler.clone();
        event_bus.subscribe::<JobScheduled, _, _>(move |evt| {
            let bus = bus.clone();
            let scheduler = scheduler.clone();
            async move {
                let job_id = evt.job_id.clone();
                scheduler.schedule_once(evt.job_id, evt.fire_at, move || {
                    let bus = bus.clone();
                    async move { bus.execute(StartJob { job_id }).await }
                })
            }
        });
    }

    {
        let bus = command_bus.clone();
        event_bus.subscribe::<JobStarted, _, _>(move |evt| {
            let bus = bus.clone();
            async move {
                match bus
                    .execute(FetchContent {
                        job_id: evt.job_id.clone(),
                    })
                    .await
                {
                    Ok(()) => {
                        bus.execute(CompleteJob {
                            job_id: evt.job_id,
                        })
                        .await
                    }
                    Err(err) => {
                        let error = common::domain::value_objects::ErrorRecord::from_app_error(&err, 0);
                        bus.execute(FailJob {
                            job_id: evt.job_id,
                            error,
                        })
                        .await
                    }
                }
            }
        });
    }

    {
        let s = services.clone();
        event_bus.subscribe::<ContentCollected, _, _>(move |evt| {
            let s = s.clone();
            async move { handle_content_collected(&s, evt).await }
        });
    }

    {
        let bus = command_bus.clone();
        event_bus.subscribe::<JobCompleted, _, _>(move |evt| {
            let bus = bus.clone();
            async move {
                bus.execute(UpdateSourceHealth {
                    source_id: evt.source_id,
                    outcome: crate::commands::HealthOutcome::Success,
                })
                .await
            }
        });
    }

    {
        let bus = command_bus.clone();
        event_bus.subscribe::<JobFailed, _, _>(move |evt| {
            let bus = bus.clone();
            async move {
                bus.execute(UpdateSourceHealth {
                    source_id: evt.source_id,
                    outcome: crate::commands::HealthOutcome::Failure,
                })
                .await
            }
        });
    }

    {
        let s = services.clone();
        event_bus.subscribe::<SourceUnhealthy, _, _>(move |evt| {
            let s = s.clone();
            async move { handlers::source::handle_source_unhealthy(&s, &evt.source_id).await }
        });
    }
}

/// Runs `NormalizeContent -> ValidateContentQuality -> DetectDuplicate ->
/// SaveContentItem` for one collected item, publishing the per-stage event
/// the design names at each step and updating job metrics along the way
/// (§4.4). A validation failure or a detected duplicate short-circuits the
/// chain without an error: both are expected outcomes, not faults.
async fn handle_content_collected(
    services: &PipelineServices,
    evt: ContentCollected,
) -> Result<(), AppError> {
    bump_metrics(
        services,
        &evt.job_id,
        JobMetrics {
            items_collected: 1,
            ..Default::default()
        },
    )
    .await;

    let normalized = handlers::content::normalize_content(
        services,
        crate::commands::NormalizeContent {
            job_id: evt.job_id.clone(),
            source_id: evt.source_id.clone(),
            raw_content: evt.raw_content.clone(),
            metadata: evt.metadata.clone(),
        },
    )
    .await?;

    services
        .events
        .publish(crate::events::ContentNormalized {
            job_id: evt.job_id.clone(),
            source_id: evt.source_id.clone(),
            raw_content: evt.raw_content.clone(),
            normalized_content: normalized.normalized_content.clone(),
            content_hash: normalized.content_hash.clone(),
            metadata: evt.metadata.clone(),
            asset_tags: normalized.asset_tags.clone(),
        })
        .await;

    let is_quality = handlers::content::validate_content_quality(
        services,
        crate::commands::ValidateContentQuality {
            normalized_content: normalized.normalized_content.clone(),
        },
    )
    .await?;

    if !is_quality {
        bump_metrics(
            services,
            &evt.job_id,
            JobMetrics {
                validation_errors: 1,
                ..Default::default()
            },
        )
        .await;
        services
            .events
            .publish(ContentValidationFailed {
                job_id: evt.job_id.clone(),
                reason: "content too short to be meaningful".to_string(),
            })
            .await;
        return Ok(());
    }

    services
        .events
        .publish(crate::events::ContentQualityValidated {
            job_id: evt.job_id.clone(),
            source_id: evt.source_id.clone(),
            raw_content: evt.raw_content.clone(),
            normalized_content: normalized.normalized_content.clone(),
            content_hash: normalized.content_hash.clone(),
            metadata: evt.metadata.clone(),
            asset_tags: normalized.asset_tags.clone(),
        })
        .await;

    let is_duplicate = handlers::content::detect_duplicate(
        services,
        crate::commands::DetectDuplicate {
            content_hash: normalized.content_hash.clone(),
        },
    )
    .await?;

    services
        .events
        .publish(crate::events::ContentDeduplicationChecked {
            job_id: evt.job_id.clone(),
            source_id: evt.source_id.clone(),
            raw_content: evt.raw_content.clone(),
            normalized_content: normalized.normalized_content.clone(),
            content_hash: normalized.content_hash.clone(),
            metadata: evt.metadata.clone(),
            asset_tags: normalized.asset_tags.clone(),
            is_duplicate,
        })
        .await;

    if is_duplicate {
        bump_metrics(
            services,
            &evt.job_id,
            JobMetrics {
                duplicates_detected: 1,
                ..Default::default()
            },
        )
        .await;
        return Ok(());
    }

    handlers::content::save_content_item(
        services,
        crate::commands::SaveContentItem {
            job_id: evt.job_id.clone(),
            source_id: evt.source_id.clone(),
            raw_content: evt.raw_content.clone(),
            normalized_content: normalized.normalized_content.clone(),
            content_hash: normalized.content_hash.clone(),
            metadata: evt.metadata.clone(),
            asset_tags: normalized.asset_tags.clone(),
        },
    )
    .await?;

    bump_metrics(
        services,
        &evt.job_id,
        JobMetrics {
            items_persisted: 1,
            ..Default::default()
        },
    )
    .await;
    Ok(())
}

async fn bump_metrics(services: &PipelineServices, job_id: &str, delta: JobMetrics) {
    if let Err(err) = handlers::job::update_job_metrics(
        services,
        UpdateJobMetrics {
            job_id: job_id.to_string(),
            delta,
        },
    )
    .await
    {
        tracing::error!(job_id, error = %err, "failed to update job metrics");
    }
}
