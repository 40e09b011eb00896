//! Shared collaborators handed to every refinement command handler (§6).

use std::sync::Arc;

use bus::EventBus;
use common::ports::hash::Hash;
use common::ports::nlp::{EntityExtractor, QualityAnalyzer, TemporalExtractor};
use common::storage::db::SurrealDbClient;
use common::utils::config::{CircuitBreakerConfig, ConcurrencyRetryConfig, RefinementConfig, RetryConfig};
use resilience::CircuitBreaker;

#[derive(Clone)]
pub struct RefinementServices {
    pub db: Arc<SurrealDbClient>,
    pub events: Arc<EventBus>,
    pub entity_extractor: Arc<dyn EntityExtractor>,
    pub temporal_extractor: Arc<dyn TemporalExtractor>,
    pub quality_analyzer: Arc<dyn QualityAnalyzer>,
    pub hasher: Arc<dyn Hash>,
    pub config: RefinementConfig,
    pub concurrency_retry_config: ConcurrencyRetryConfig,
    pub retry_config: RetryConfig,
    /// One breaker shared by every NLP call (§5: "every external call ...
    /// runs under a deadline ... counted as a failure for retry/breaker").
    /// Unlike the ingestion pipeline's per-source breakers, the NLP ports
    /// have no per-source identity to key on.
    pub nlp_breaker: CircuitBreaker,
}

impl RefinementServices {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<SurrealDbClient>,
        events: Arc<EventBus>,
        entity_extractor: Arc<dyn EntityExtractor>,
        temporal_extractor: Arc<dyn TemporalExtractor>,
        quality_analyzer: Arc<dyn QualityAnalyzer>,
        hasher: Arc<dyn Hash>,
        config: RefinementConfig,
        concurrency_retry_config: ConcurrencyRetryConfig,
        retry_config: RetryConfig,
        circuit_breaker_config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            db,
            events,
            entity_extractor,
            temporal_extractor,
            quality_analyzer,
            hasher,
            config,
            concurrency_retry_config,
            retry_config,
            nlp_breaker: CircuitBreaker::new(circuit_breaker_config),
        }
    }
}
