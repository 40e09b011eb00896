//! NLP ports (§6): entity extraction, temporal analysis, quality scoring.
//! Concrete backends are out-of-scope external collaborators (§1) — the
//! refinement pipeline is fully tested against fakes of these traits, the
//! same dependency-inversion seam `PipelineServices` plays in the teacher
//! crate (`ingestion-pipeline/src/pipeline/services.rs`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::value_objects::{CryptoEntity, QualityScore, TemporalContext};
use crate::error::AppError;

#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract(&self, content: &str) -> Result<Vec<CryptoEntity>, AppError>;
}

#[async_trait]
pub trait TemporalExtractor: Send + Sync {
    async fn extract(
        &self,
        content: &str,
        published_at: DateTime<Utc>,
    ) -> Result<Option<TemporalContext>, AppError>;
}

/// Inputs available to the quality analyzer beyond the raw content.
pub struct QualityAnalysisInput<'a> {
    pub token_count: usize,
    pub entities: &'a [CryptoEntity],
    pub published_at: DateTime<Utc>,
}

#[async_trait]
pub trait QualityAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        content: &str,
        input: QualityAnalysisInput<'_>,
    ) -> Result<QualityScore, AppError>;
}
