//! Handlers for source lifecycle and health (§4.4, §4.6).

use chrono::Utc;
use common::error::AppError;

use crate::commands::{ConfigureSource, DeleteSource, HealthOutcome, UpdateSourceHealth};
use crate::concurrency::retry_on_concurrency;
use crate::domain::SourceConfiguration;
use crate::events::{SourceConfigured, SourceUnhealthy};
use crate::services::PipelineServices;

/// Create-or-update: a fresh `source_id` creates a new source at version
/// 0; an existing one is reconfigured in place (§4.4 table:
/// `ConfigureSource/CreateSource/UpdateSource/DeleteSource`).
pub async fn configure_source(
    services: &PipelineServices,
    cmd: ConfigureSource,
) -> Result<(), AppError> {
    let existing: Option<SourceConfiguration> = services.db.load_aggregate(&cmd.source_id).await?;

    match existing {
        None => {
            let source = SourceConfiguration::configure(
                cmd.source_id.clone(),
                cmd.source_type,
                cmd.name,
                cmd.config,
                cmd.credentials,
            );
            services.db.create_aggregate(&source).await?;
        }
        Some(_) => {
            retry_on_concurrency(&services.concurrency_retry_config, || async {
                let mut source: SourceConfiguration = services
                    .db
                    .load_aggregate(&cmd.source_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound {
                        kind: "source_configuration",
                        id: cmd.source_id.clone(),
                    })?;
                source.source_type = cmd.source_type.clone();
                source.name = cmd.name.clone();
                source.config = cmd.config.clone();
                source.credentials = cmd.credentials.clone();
                source.updated_at = Utc::now();
                services.db.save_aggregate(&mut source).await
            })
            .await?;
        }
    }

    services
        .events
        .publish(SourceConfigured {
            source_id: cmd.source_id,
        })
        .await;
    Ok(())
}

pub async fn delete_source(services: &PipelineServices, cmd: DeleteSource) -> Result<(), AppError> {
    retry_on_concurrency(&services.concurrency_retry_config, || async {
        let mut source: SourceConfiguration = services
            .db
            .load_aggregate(&cmd.source_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                kind: "source_configuration",
                id: cmd.source_id.clone(),
            })?;
        source.disable("deleted");
        services.db.save_aggregate(&mut source).await
    })
    .await
}

/// Records success/failure against the source's health counters and, on
/// crossing into unhealthy, publishes `SourceUnhealthy` exactly once
/// (§4.6). Retries on `Concurrency` since this handler re-mutates an
/// aggregate it just loaded.
pub async fn update_source_health(
    services: &PipelineServices,
    cmd: UpdateSourceHealth,
) -> Result<(), AppError> {
    let health_config = services.health_config.clone();
    let mut just_crossed = false;

    retry_on_concurrency(&services.concurrency_retry_config, || async {
        let mut source: SourceConfiguration = services
            .db
            .load_aggregate(&cmd.source_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                kind: "source_configuration",
                id: cmd.source_id.clone(),
            })?;

        match cmd.outcome {
            HealthOutcome::Success => source.record_success(&health_config),
            HealthOutcome::Failure => source.record_failure(&health_config),
        }

        if source.crossed_into_unhealthy(&health_config) {
            source.latch_unhealthy();
            just_crossed = true;
        } else {
            just_crossed = false;
        }

        services.db.save_aggregate(&mut source).await
    })
    .await?;

    if just_crossed {
        let source: SourceConfiguration = services
            .db
            .load_aggregate(&cmd.source_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                kind: "source_configuration",
                id: cmd.source_id.clone(),
            })?;
        services
            .events
            .publish(SourceUnhealthy {
                source_id: cmd.source_id,
                failure_rate: 100.0 - source.health.success_rate,
                consecutive_failures: source.health.consecutive_failures,
                detected_at: Utc::now(),
            })
            .await;
    }
    Ok(())
}

/// Reacts to `SourceUnhealthy`: loads the source, skips if already
/// inactive, otherwise disables it. Retries on `Concurrency` up to the
/// configured bound before logging and giving up (§4.6).
pub async fn handle_source_unhealthy(
    services: &PipelineServices,
    source_id: &str,
) -> Result<(), AppError> {
    let result = retry_on_concurrency(&services.concurrency_retry_config, || async {
        let mut source: SourceConfiguration = services
            .db
            .load_aggregate(source_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                kind: "source_configuration",
                id: source_id.to_string(),
            })?;
        if !source.is_active {
            return Ok(());
        }
        source.disable("Automatic disable due to health issues");
        services.db.save_aggregate(&mut source).await
    })
    .await;

    if let Err(ref err) = result {
        tracing::error!(source_id, error = %err, "failed to auto-disable unhealthy source");
    }
    result
}
