//! Command set for the ingestion pipeline (§4.4), one struct per row of
//! the command table plus its declared result type.

use chrono::{DateTime, Utc};
use common::domain::value_objects::ErrorRecord;
use serde_json::Value;

use crate::domain::{ContentMetadata, JobMetrics};

pub struct ScheduleJob {
    pub source_id: String,
    pub fire_at: DateTime<Utc>,
}
impl bus::Command for ScheduleJob {
    type Result = String;
}

pub struct StartJob {
    pub job_id: String,
}
impl bus::Command for StartJob {
    type Result = ();
}

/// Invokes the source adapter (through breaker + retry) and emits one
/// `ContentCollected` per yielded item.
pub struct FetchContent {
    pub job_id: String,
}
impl bus::Command for FetchContent {
    type Result = ();
}

pub struct UpdateJobMetrics {
    pub job_id: String,
    pub delta: JobMetrics,
}
impl bus::Command for UpdateJobMetrics {
    type Result = ();
}

pub struct CompleteJob {
    pub job_id: String,
}
impl bus::Command for CompleteJob {
    type Result = ();
}

pub struct FailJob {
    pub job_id: String,
    pub error: ErrorRecord,
}
impl bus::Command for FailJob {
    type Result = ();
}

pub struct NormalizeContent {
    pub job_id: String,
    pub source_id: String,
    pub raw_content: String,
    pub metadata: ContentMetadata,
}
pub struct Normalized {
    pub normalized_content: String,
    pub content_hash: String,
    pub asset_tags: Vec<common::domain::value_objects::AssetTag>,
}
impl bus::Command for NormalizeContent {
    type Result = Normalized;
}

pub struct ValidateContentQuality {
    pub normalized_content: String,
}
impl bus::Command for ValidateContentQuality {
    type Result = bool;
}

pub struct DetectDuplicate {
    pub content_hash: String,
}
impl bus::Command for DetectDuplicate {
    type Result = bool;
}

pub struct SaveContentItem {
    pub job_id: String,
    pub source_id: String,
    pub raw_content: String,
    pub normalized_content: String,
    pub content_hash: String,
    pub metadata: ContentMetadata,
    pub asset_tags: Vec<common::domain::value_objects::AssetTag>,
}
impl bus::Command for SaveContentItem {
    type Result = String;
}

pub struct ConfigureSource {
    pub source_id: String,
    pub source_type: String,
    pub name: String,
    pub config: Value,
    pub credentials: Vec<u8>,
}
impl bus::Command for ConfigureSource {
    type Result = ();
}

pub struct DeleteSource {
    pub source_id: String,
}
impl bus::Command for DeleteSource {
    type Result = ();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthOutcome {
    Success,
    Failure,
}

pub struct UpdateSourceHealth {
    pub source_id: String,
    pub outcome: HealthOutcome,
}
impl bus::Command for UpdateSourceHealth {
    type Result = ();
}
