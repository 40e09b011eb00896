//! Deterministic reference backends for the refinement pipeline's NLP ports
//! (§6). `common::ports::nlp` documents these traits as out-of-scope
//! external collaborators the core is tested against only via fakes — but
//! `RefinementServices` takes one concrete instance of each directly
//! (unlike `AdapterRegistry`, there's no empty-by-default registry to fall
//! back on), so the worker binary needs *something* wired here to run at
//! all. These are the same kind of stand-in the teacher reaches for with
//! `EmbeddingProvider::new_hashed` "to avoid external dependencies" — plain
//! text heuristics, not a real NLP service, intended to be swapped out by
//! an operator who has one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use common::domain::value_objects::{CryptoEntity, QualityScore, TemporalContext};
use common::error::AppError;
use common::ports::nlp::{EntityExtractor, QualityAnalysisInput, QualityAnalyzer, TemporalExtractor};

/// Same curated list `ingestion_pipeline::asset_tagging` tags with; entities
/// here carry byte offsets instead of a bare confidence-classed tag since
/// `CryptoEntity` is a richer value object than `AssetTag`.
const KNOWN_TICKERS: &[&str] = &[
    "BTC", "ETH", "USDT", "USDC", "BNB", "XRP", "ADA", "SOL", "DOGE", "DOT", "MATIC", "LTC",
    "AVAX", "LINK", "UNI", "ATOM", "TRX", "SHIB", "XLM", "NEAR",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicEntityExtractor;

#[async_trait]
impl EntityExtractor for HeuristicEntityExtractor {
    /// Tags every known-ticker token with high confidence and every other
    /// all-uppercase ticker-shaped token with medium confidence, mirroring
    /// `asset_tagging::extract_asset_tags`'s split but keeping the byte span
    /// of each match.
    async fn extract(&self, content: &str) -> Result<Vec<CryptoEntity>, AppError> {
        let mut entities = Vec::new();
        let mut pos = 0;

        for token in content.split(|c: char| !c.is_ascii_alphabetic()) {
            let start = pos;
            pos += token.len();
            // account for the delimiter the split consumed, if any
            if pos < content.len() {
                pos += content[pos..].chars().next().map_or(0, char::len_utf8);
            }

            if token.is_empty() || token.len() > 10 {
                continue;
            }
            if !token.chars().all(|c| c.is_ascii_uppercase()) {
                continue;
            }

            let confidence = if KNOWN_TICKERS.contains(&token) { 0.9 } else { 0.6 };
            entities.push(CryptoEntity {
                entity_type: "ASSET".to_string(),
                value: token.to_string(),
                confidence,
                start_pos: start,
                end_pos: start + token.len(),
            });
        }

        Ok(entities)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicTemporalExtractor;

#[async_trait]
impl TemporalExtractor for HeuristicTemporalExtractor {
    /// No date parsing of its own; treats the chunk's own publication time
    /// as its only known temporal anchor.
    async fn extract(
        &self,
        _content: &str,
        published_at: DateTime<Utc>,
    ) -> Result<Option<TemporalContext>, AppError> {
        Ok(Some(TemporalContext {
            published_at,
            event_timestamp: None,
        }))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicQualityAnalyzer;

const IDEAL_TOKEN_COUNT: f64 = 50.0;
const FRESHNESS_FULL_CREDIT_DAYS: f64 = 7.0;
const FRESHNESS_FLOOR_DAYS: f64 = 90.0;
const FRESHNESS_FLOOR: f64 = 0.2;

#[async_trait]
impl QualityAnalyzer for HeuristicQualityAnalyzer {
    async fn analyze(
        &self,
        content: &str,
        input: QualityAnalysisInput<'_>,
    ) -> Result<QualityScore, AppError> {
        let length = (input.token_count as f64 / IDEAL_TOKEN_COUNT).min(1.0);

        let words: Vec<&str> = content.split_whitespace().collect();
        let coherence = if words.is_empty() {
            0.0
        } else {
            let alphabetic = words
                .iter()
                .filter(|w| w.chars().any(|c| c.is_alphabetic()))
                .count();
            alphabetic as f64 / words.len() as f64
        };

        let relevance = if input.entities.is_empty() {
            0.2
        } else {
            (0.5 + 0.1 * input.entities.len() as f64).min(1.0)
        };

        let age_days = (Utc::now() - input.published_at).num_seconds() as f64 / 86_400.0;
        let freshness = if age_days <= FRESHNESS_FULL_CREDIT_DAYS {
            1.0
        } else if age_days >= FRESHNESS_FLOOR_DAYS {
            FRESHNESS_FLOOR
        } else {
            let span = FRESHNESS_FLOOR_DAYS - FRESHNESS_FULL_CREDIT_DAYS;
            let decayed = (age_days - FRESHNESS_FULL_CREDIT_DAYS) / span;
            1.0 - decayed * (1.0 - FRESHNESS_FLOOR)
        };

        QualityScore::from_components(length, coherence, relevance, freshness.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn entity_extractor_tags_known_ticker_with_high_confidence() {
        let extractor = HeuristicEntityExtractor;
        let entities = extractor.extract("Bitcoin hits $50,000 says BTC analyst").await.unwrap();
        let btc = entities.iter().find(|e| e.value == "BTC").unwrap();
        assert!(btc.confidence > 0.8);
        assert_eq!(&"Bitcoin hits $50,000 says BTC analyst"[btc.start_pos..btc.end_pos], "BTC");
    }

    #[tokio::test]
    async fn entity_extractor_skips_lowercase_words() {
        let extractor = HeuristicEntityExtractor;
        let entities = extractor.extract("bitcoin rallies hard today").await.unwrap();
        assert!(entities.is_empty());
    }

    #[tokio::test]
    async fn temporal_extractor_echoes_published_at_with_no_event_timestamp() {
        let extractor = HeuristicTemporalExtractor;
        let published_at = Utc::now();
        let context = extractor.extract("some content", published_at).await.unwrap().unwrap();
        assert_eq!(context.published_at, published_at);
        assert!(context.event_timestamp.is_none());
    }

    #[tokio::test]
    async fn quality_analyzer_rewards_entities_and_fresh_content() {
        let analyzer = HeuristicQualityAnalyzer;
        let entities = vec![CryptoEntity {
            entity_type: "ASSET".to_string(),
            value: "BTC".to_string(),
            confidence: 0.9,
            start_pos: 0,
            end_pos: 3,
        }];
        let score = analyzer
            .analyze(
                "Bitcoin hits fifty thousand dollars today on strong volume",
                QualityAnalysisInput {
                    token_count: 12,
                    entities: &entities,
                    published_at: Utc::now(),
                },
            )
            .await
            .unwrap();
        assert!(score.relevance > 0.5);
        assert!((score.freshness - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn quality_analyzer_penalizes_stale_content() {
        let analyzer = HeuristicQualityAnalyzer;
        let old = Utc::now() - chrono::Duration::days(120);
        let score = analyzer
            .analyze(
                "old news",
                QualityAnalysisInput {
                    token_count: 2,
                    entities: &[],
                    published_at: old,
                },
            )
            .await
            .unwrap();
        assert!((score.freshness - FRESHNESS_FLOOR).abs() < 1e-9);
    }
}
