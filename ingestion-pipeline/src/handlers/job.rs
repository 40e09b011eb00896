//! Handlers for `ScheduleJob`, `StartJob`, `FetchContent`,
//! `UpdateJobMetrics`, `CompleteJob`, `FailJob` (§4.4).

use common::error::AppError;
use uuid::Uuid;

use crate::commands::{CompleteJob, FailJob, FetchContent, ScheduleJob, StartJob, UpdateJobMetrics};
use crate::concurrency::retry_on_concurrency;
use crate::domain::{IngestionJob, SourceConfiguration};
use crate::events::{ContentCollected, JobCompleted, JobFailed, JobScheduled, JobStarted};
use crate::services::PipelineServices;

pub async fn schedule_job(services: &PipelineServices, cmd: ScheduleJob) -> Result<String, AppError> {
    let source: SourceConfiguration = services
        .db
        .load_aggregate(&cmd.source_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            kind: "source_configuration",
            id: cmd.source_id.clone(),
        })?;
    if !source.is_active {
        return Err(AppError::Validation(format!(
            "source {} is not active",
            cmd.source_id
        )));
    }

    let job_id = Uuid::new_v4().to_string();
    let job = IngestionJob::schedule(
        job_id.clone(),
        cmd.source_id.clone(),
        cmd.fire_at,
        source.config.clone(),
    );
    services.db.create_aggregate(&job).await?;

    services
        .events
        .publish(JobScheduled {
            job_id: job_id.clone(),
            source_id: cmd.source_id,
            fire_at: cmd.fire_at,
        })
        .await;
    Ok(job_id)
}

pub async fn start_job(services: &PipelineServices, cmd: StartJob) -> Result<(), AppError> {
    retry_on_concurrency(&services.concurrency_retry_config, || async {
        let mut job: IngestionJob = services
            .db
            .load_aggregate(&cmd.job_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                kind: "ingestion_job",
                id: cmd.job_id.clone(),
            })?;
        job.start()?;
        services.db.save_aggregate(&mut job).await
    })
    .await?;

    services
        .events
        .publish(JobStarted {
            job_id: cmd.job_id,
        })
        .await;
    Ok(())
}

/// Invokes the source adapter through circuit breaker + retry, emitting
/// one `ContentCollected` per yielded item.
pub async fn fetch_content(services: &PipelineServices, cmd: FetchContent) -> Result<(), AppError> {
    let job: IngestionJob = services
        .db
        .load_aggregate(&cmd.job_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            kind: "ingestion_job",
            id: cmd.job_id.clone(),
        })?;
    let source: SourceConfiguration = services
        .db
        .load_aggregate(&job.source_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            kind: "source_configuration",
            id: job.source_id.clone(),
        })?;
    let adapter = services
        .adapters
        .get(&source.source_type)
        .ok_or_else(|| AppError::NotFound {
            kind: "source_adapter",
            id: source.source_type.clone(),
        })?;

    let breaker = services.breaker_for(&source.id);
    let retry_config = services.retry_config.clone();
    let config_snapshot = source.config.clone();

    let items = breaker
        .call(|| async {
            resilience::retry_execute(&retry_config, || async { adapter.collect(&config_snapshot).await })
                .await
                .into_result()
        })
        .await?;

    for item in items {
        let metadata = serde_json::from_value(item.metadata.clone()).unwrap_or_default();
        services
            .events
            .publish(ContentCollected {
                job_id: cmd.job_id.clone(),
                source_id: source.id.clone(),
                raw_content: item.raw_content,
                metadata,
            })
            .await;
    }
    Ok(())
}

pub async fn update_job_metrics(
    services: &PipelineServices,
    cmd: UpdateJobMetrics,
) -> Result<(), AppError> {
    retry_on_concurrency(&services.concurrency_retry_config, || async {
        let mut job: IngestionJob = services
            .db
            .load_aggregate(&cmd.job_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                kind: "ingestion_job",
                id: cmd.job_id.clone(),
            })?;
        job.update_metrics(&cmd.delta)?;
        services.db.save_aggregate(&mut job).await
    })
    .await
}

pub async fn complete_job(services: &PipelineServices, cmd: CompleteJob) -> Result<(), AppError> {
    let source_id = retry_on_concurrency(&services.concurrency_retry_config, || async {
        let mut job: IngestionJob = services
            .db
            .load_aggregate(&cmd.job_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                kind: "ingestion_job",
                id: cmd.job_id.clone(),
            })?;
        job.complete()?;
        services.db.save_aggregate(&mut job).await?;
        Ok(job.source_id.clone())
    })
    .await?;

    services
        .events
        .publish(JobCompleted {
            job_id: cmd.job_id,
            source_id,
        })
        .await;
    Ok(())
}

pub async fn fail_job(services: &PipelineServices, cmd: FailJob) -> Result<(), AppError> {
    let error = cmd.error.clone();
    let source_id = retry_on_concurrency(&services.concurrency_retry_config, || async {
        let mut job: IngestionJob = services
            .db
            .load_aggregate(&cmd.job_id)
            .await?
            .ok_or_else(|| AppError::NotFound {
                kind: "ingestion_job",
                id: cmd.job_id.clone(),
            })?;
        job.fail(error.clone())?;
        services.db.save_aggregate(&mut job).await?;
        Ok(job.source_id.clone())
    })
    .await?;

    services
        .events
        .publish(JobFailed {
            job_id: cmd.job_id,
            source_id,
            error: cmd.error,
        })
        .await;
    Ok(())
}
