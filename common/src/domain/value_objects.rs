//! Value objects shared by the ingestion and refinement aggregates (§3).
//! None of these carry identity; they're always owned by an aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Confidence bucket for an `AssetTag`. Exactly one applies per tag (§8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceClass {
    High,
    Medium,
    Low,
}

/// A detected ticker-like token, e.g. `{symbol: "BTC", confidence: 0.92}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetTag {
    pub symbol: String,
    pub confidence: f64,
}

impl AssetTag {
    /// Builds a validated tag. Rejects symbols that don't match
    /// `^[A-Z]{1,10}$` and confidences outside `[0, 1]`.
    pub fn new(symbol: impl Into<String>, confidence: f64) -> Result<Self, AppError> {
        let symbol = symbol.into();
        if symbol.is_empty()
            || symbol.len() > 10
            || !symbol.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(AppError::Validation(format!(
                "asset tag symbol {symbol:?} must match ^[A-Z]{{1,10}}$"
            )));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(AppError::Validation(format!(
                "asset tag confidence {confidence} must be within [0, 1]"
            )));
        }
        Ok(Self { symbol, confidence })
    }

    /// Boundaries: `> 0.8` high, `[0.5, 0.8]` medium, `< 0.5` low.
    pub fn confidence_class(&self) -> ConfidenceClass {
        if self.confidence > 0.8 {
            ConfidenceClass::High
        } else if self.confidence >= 0.5 {
            ConfidenceClass::Medium
        } else {
            ConfidenceClass::Low
        }
    }

    pub fn is_high(&self) -> bool {
        self.confidence_class() == ConfidenceClass::High
    }

    pub fn is_medium(&self) -> bool {
        self.confidence_class() == ConfidenceClass::Medium
    }

    pub fn is_low(&self) -> bool {
        self.confidence_class() == ConfidenceClass::Low
    }
}

/// Position of a `Chunk` within its refinement's normalized content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPosition {
    pub index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl ChunkPosition {
    pub fn new(index: usize, start_offset: usize, end_offset: usize) -> Result<Self, AppError> {
        if end_offset <= start_offset {
            return Err(AppError::Validation(format!(
                "chunk position end_offset ({end_offset}) must be greater than start_offset ({start_offset})"
            )));
        }
        Ok(Self {
            index,
            start_offset,
            end_offset,
        })
    }

    pub fn length(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

/// Component quality scores for a chunk, each in `[0, 1]`. Weights for
/// `overall` are fixed and documented here (Open Question 1, resolved in
/// DESIGN.md): length 0.2, coherence 0.3, relevance 0.3, freshness 0.2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    pub overall: f64,
    pub length: f64,
    pub coherence: f64,
    pub relevance: f64,
    pub freshness: f64,
}

impl QualityScore {
    pub const LENGTH_WEIGHT: f64 = 0.2;
    pub const COHERENCE_WEIGHT: f64 = 0.3;
    pub const RELEVANCE_WEIGHT: f64 = 0.3;
    pub const FRESHNESS_WEIGHT: f64 = 0.2;

    /// Computes `overall` as the fixed weighted mean of the four
    /// components. Each component must already be in `[0, 1]`.
    pub fn from_components(
        length: f64,
        coherence: f64,
        relevance: f64,
        freshness: f64,
    ) -> Result<Self, AppError> {
        for (name, value) in [
            ("length", length),
            ("coherence", coherence),
            ("relevance", relevance),
            ("freshness", freshness),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::Validation(format!(
                    "quality component {name} ({value}) must be within [0, 1]"
                )));
            }
        }

        let overall = length * Self::LENGTH_WEIGHT
            + coherence * Self::COHERENCE_WEIGHT
            + relevance * Self::RELEVANCE_WEIGHT
            + freshness * Self::FRESHNESS_WEIGHT;

        Ok(Self {
            overall,
            length,
            coherence,
            relevance,
            freshness,
        })
    }

    pub fn passes_threshold(&self, threshold: f64) -> bool {
        self.overall >= threshold
    }
}

/// Temporal grounding of a chunk relative to its source item's publish time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalContext {
    pub published_at: DateTime<Utc>,
    pub event_timestamp: Option<DateTime<Utc>>,
}

/// Entity recognized inside chunk content (§6 `IEntityExtractor`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptoEntity {
    pub entity_type: String,
    pub value: String,
    pub confidence: f64,
    pub start_pos: usize,
    pub end_pos: usize,
}

/// Error taxonomy mirrored onto a persistable record attached to a Job (§3,
/// §7). Distinct from `AppError`: this is the data shape appended to
/// `job.errors[]`, not the in-flight error used for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorType {
    Network,
    Parsing,
    Validation,
    Auth,
    RateLimit,
    Timeout,
    Unknown,
}

impl ErrorType {
    /// §3: retryable iff NETWORK, RATE_LIMIT or TIMEOUT.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::Timeout)
    }
}

impl From<&AppError> for ErrorType {
    fn from(err: &AppError) -> Self {
        match err.error_type() {
            "NETWORK" => Self::Network,
            "RATE_LIMIT" => Self::RateLimit,
            "TIMEOUT" => Self::Timeout,
            "PARSING" => Self::Parsing,
            "AUTH" => Self::Auth,
            "VALIDATION" => Self::Validation,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    pub error_type: ErrorType,
    pub message: String,
    pub stack_trace: Option<String>,
    pub retry_count: u32,
}

impl ErrorRecord {
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            error_type,
            message: message.into(),
            stack_trace: None,
            retry_count: 0,
        }
    }

    pub fn from_app_error(err: &AppError, retry_count: u32) -> Self {
        Self {
            error_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            error_type: ErrorType::from(err),
            message: err.to_string(),
            stack_trace: None,
            retry_count,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.error_type.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_tag_confidence_classes_have_exactly_one_true() {
        let high = AssetTag::new("BTC", 0.95).unwrap();
        assert!(high.is_high() && !high.is_medium() && !high.is_low());

        let medium_low_boundary = AssetTag::new("ETH", 0.5).unwrap();
        assert!(medium_low_boundary.is_medium());

        let medium_high_boundary = AssetTag::new("SOL", 0.8).unwrap();
        assert!(medium_high_boundary.is_medium());

        let low = AssetTag::new("DOGE", 0.2).unwrap();
        assert!(low.is_low() && !low.is_medium() && !low.is_high());
    }

    #[test]
    fn asset_tag_rejects_lowercase_and_out_of_range_confidence() {
        assert!(AssetTag::new("btc", 0.5).is_err());
        assert!(AssetTag::new("BTC", 1.5).is_err());
        assert!(AssetTag::new("TOOLONGSYMBOL", 0.5).is_err());
    }

    #[test]
    fn chunk_position_requires_end_after_start() {
        assert!(ChunkPosition::new(0, 10, 5).is_err());
        let pos = ChunkPosition::new(0, 0, 10).unwrap();
        assert_eq!(pos.length(), 10);
    }

    #[test]
    fn quality_score_weighted_mean_matches_fixed_weights() {
        let score = QualityScore::from_components(1.0, 1.0, 1.0, 1.0).unwrap();
        assert!((score.overall - 1.0).abs() < 1e-9);

        let mixed = QualityScore::from_components(0.8, 0.6, 0.1, 0.5).unwrap();
        let expected = 0.8 * 0.2 + 0.6 * 0.3 + 0.1 * 0.3 + 0.5 * 0.2;
        assert!((mixed.overall - expected).abs() < 1e-9);
    }

    #[test]
    fn error_type_retryability_matches_spec() {
        assert!(ErrorType::Network.is_retryable());
        assert!(ErrorType::RateLimit.is_retryable());
        assert!(ErrorType::Timeout.is_retryable());
        assert!(!ErrorType::Parsing.is_retryable());
        assert!(!ErrorType::Validation.is_retryable());
        assert!(!ErrorType::Auth.is_retryable());
        assert!(!ErrorType::Unknown.is_retryable());
    }
}
