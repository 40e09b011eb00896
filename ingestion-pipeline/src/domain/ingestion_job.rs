//! `IngestionJob` aggregate (§3, §4.4). Mutated only through its methods;
//! the command handlers never touch its fields directly.

use chrono::{DateTime, Utc};
use common::domain::value_objects::ErrorRecord;
use common::error::AppError;
use common::versioned_aggregate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobMetrics {
    pub items_collected: u64,
    pub items_persisted: u64,
    pub duplicates_detected: u64,
    pub validation_errors: u64,
    pub bytes_processed: u64,
    pub duration_ms: u64,
}

impl JobMetrics {
    pub fn add(&mut self, delta: &JobMetrics) {
        self.items_collected += delta.items_collected;
        self.items_persisted += delta.items_persisted;
        self.duplicates_detected += delta.duplicates_detected;
        self.validation_errors += delta.validation_errors;
        self.bytes_processed += delta.bytes_processed;
        self.duration_ms += delta.duration_ms;
    }
}

versioned_aggregate!(IngestionJob, "ingestion_jobs", {
    source_id: String,
    status: JobStatus,
    scheduled_at: DateTime<Utc>,
    executed_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    metrics: JobMetrics,
    errors: Vec<ErrorRecord>,
    source_config: Value
});

impl IngestionJob {
    pub fn schedule(
        job_id: String,
        source_id: String,
        scheduled_at: DateTime<Utc>,
        source_config: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: job_id,
            created_at: now,
            updated_at: now,
            version: 0,
            source_id,
            status: JobStatus::Pending,
            scheduled_at,
            executed_at: None,
            completed_at: None,
            metrics: JobMetrics::default(),
            errors: Vec::new(),
            source_config,
        }
    }

    pub fn start(&mut self) -> Result<(), AppError> {
        if self.status != JobStatus::Pending {
            return Err(AppError::InvariantViolation(format!(
                "job {} is not PENDING",
                self.id
            )));
        }
        self.status = JobStatus::Running;
        self.executed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Additive, per-delta update so duplicate event delivery is harmless
    /// (§5 idempotency).
    pub fn update_metrics(&mut self, delta: &JobMetrics) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::InvariantViolation(format!(
                "job {} is terminal",
                self.id
            )));
        }
        self.metrics.add(delta);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn record_error(&mut self, error: ErrorRecord) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::InvariantViolation(format!(
                "job {} is terminal",
                self.id
            )));
        }
        self.errors.push(error);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), AppError> {
        if self.status != JobStatus::Running {
            return Err(AppError::InvariantViolation(format!(
                "job {} is not RUNNING",
                self.id
            )));
        }
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn fail(&mut self, error: ErrorRecord) -> Result<(), AppError> {
        if self.status != JobStatus::Running {
            return Err(AppError::InvariantViolation(format!(
                "job {} is not RUNNING",
                self.id
            )));
        }
        self.errors.push(error);
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::InvariantViolation(format!(
                "job {} is already terminal",
                self.id
            )));
        }
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_job() -> IngestionJob {
        IngestionJob::schedule(
            "job-1".to_string(),
            "source-1".to_string(),
            Utc::now(),
            Value::Null,
        )
    }

    #[test]
    fn schedule_creates_a_pending_job_at_version_zero() {
        let job = pending_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.version, 0);
    }

    #[test]
    fn start_transitions_pending_to_running() {
        let mut job = pending_job();
        job.start().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.executed_at.is_some());
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut job = pending_job();
        job.start().unwrap();
        assert!(job.start().is_err());
    }

    #[test]
    fn update_metrics_is_additive() {
        let mut job = pending_job();
        job.start().unwrap();
        job.update_metrics(&JobMetrics {
            items_collected: 2,
            ..Default::default()
        })
        .unwrap();
        job.update_metrics(&JobMetrics {
            items_persisted: 1,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(job.metrics.items_collected, 2);
        assert_eq!(job.metrics.items_persisted, 1);
    }

    #[test]
    fn complete_requires_running() {
        let mut job = pending_job();
        assert!(job.complete().is_err());
        job.start().unwrap();
        job.complete().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[test]
    fn terminal_job_rejects_further_mutation() {
        let mut job = pending_job();
        job.start().unwrap();
        job.complete().unwrap();
        assert!(job
            .update_metrics(&JobMetrics::default())
            .is_err());
        assert!(job.cancel().is_err());
    }
}
