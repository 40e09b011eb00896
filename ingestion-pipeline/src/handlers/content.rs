//! Handlers for `NormalizeContent`, `ValidateContentQuality`,
//! `DetectDuplicate`, `SaveContentItem` (§4.4).

use common::error::AppError;
use uuid::Uuid;

use crate::commands::{DetectDuplicate, Normalized, NormalizeContent, SaveContentItem, ValidateContentQuality};
use crate::dedup;
use crate::domain::ContentItem;
use crate::events::ContentIngested;
use crate::normalization;
use crate::services::PipelineServices;

pub async fn normalize_content(
    _services: &PipelineServices,
    cmd: NormalizeContent,
) -> Result<Normalized, AppError> {
    let normalized_content = normalization::normalize(&cmd.raw_content);
    let content_hash = normalization::content_hash(_services.hasher.as_ref(), &normalized_content);
    let asset_tags = crate::asset_tagging::extract_asset_tags(&normalized_content);
    Ok(Normalized {
        normalized_content,
        content_hash,
        asset_tags,
    })
}

/// Length/language/spam filters (§4.4). Content shorter than 10
/// non-whitespace characters is rejected as too thin to be meaningful.
pub async fn validate_content_quality(
    _services: &PipelineServices,
    cmd: ValidateContentQuality,
) -> Result<bool, AppError> {
    Ok(cmd.normalized_content.trim().chars().count() >= 10)
}

pub async fn detect_duplicate(
    services: &PipelineServices,
    cmd: DetectDuplicate,
) -> Result<bool, AppError> {
    if services.dedup.might_contain(&cmd.content_hash) {
        return Ok(true);
    }
    let existing = dedup::find_by_content_hash(&services.db, &cmd.content_hash).await?;
    Ok(existing.is_some())
}

pub async fn save_content_item(
    services: &PipelineServices,
    cmd: SaveContentItem,
) -> Result<String, AppError> {
    let content_id = Uuid::new_v4().to_string();
    let item = ContentItem::new(
        content_id.clone(),
        cmd.source_id.clone(),
        cmd.content_hash.clone(),
        cmd.raw_content.clone(),
        cmd.normalized_content.clone(),
        cmd.metadata.clone(),
        cmd.asset_tags.clone(),
    );
    services.db.create_aggregate(&item).await?;
    services.dedup.record(&cmd.content_hash);

    services
        .events
        .publish(ContentIngested {
            job_id: cmd.job_id,
            source_id: cmd.source_id,
            content_id: content_id.clone(),
            content_hash: cmd.content_hash,
            normalized_content: cmd.normalized_content,
            published_at: cmd.metadata.published_at,
        })
        .await;
    Ok(content_id)
}
