//! Events emitted by the ingestion pipeline (§4.4, §2 data/control flow).

use chrono::{DateTime, Utc};
use common::domain::value_objects::{AssetTag, ErrorRecord};

use crate::domain::ContentMetadata;

macro_rules! event {
    ($name:ident { $($field:ident: $ty:ty),* $(,)? }) => {
        #[derive(Clone, Debug)]
        pub struct $name {
            $(pub $field: $ty),*
        }
        impl bus::Event for $name {}
    };
}

event!(JobScheduled { job_id: String, source_id: String, fire_at: DateTime<Utc> });
event!(JobStarted { job_id: String });
event!(ContentCollected {
    job_id: String,
    source_id: String,
    raw_content: String,
    metadata: ContentMetadata,
});
event!(ContentNormalized {
    job_id: String,
    source_id: String,
    raw_content: String,
    normalized_content: String,
    content_hash: String,
    metadata: ContentMetadata,
    asset_tags: Vec<AssetTag>,
});
event!(ContentQualityValidated {
    job_id: String,
    source_id: String,
    raw_content: String,
    normalized_content: String,
    content_hash: String,
    metadata: ContentMetadata,
    asset_tags: Vec<AssetTag>,
});
event!(ContentValidationFailed { job_id: String, reason: String });
event!(ContentDeduplicationChecked {
    job_id: String,
    source_id: String,
    raw_content: String,
    normalized_content: String,
    content_hash: String,
    metadata: ContentMetadata,
    asset_tags: Vec<AssetTag>,
    is_duplicate: bool,
});
event!(ContentIngested {
    job_id: String,
    source_id: String,
    content_id: String,
    content_hash: String,
    normalized_content: String,
    published_at: Option<DateTime<Utc>>,
});
event!(JobCompleted { job_id: String, source_id: String });
event!(JobFailed { job_id: String, source_id: String, error: ErrorRecord });
event!(SourceConfigured { source_id: String });
event!(SourceUnhealthy {
    source_id: String,
    failure_rate: f64,
    consecutive_failures: u32,
    detected_at: DateTime<Utc>,
});
