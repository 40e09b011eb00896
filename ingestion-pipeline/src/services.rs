//! Shared collaborators handed to every command handler (§6), the same
//! dependency-inversion seam the teacher crate's `PipelineServices` plays.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bus::EventBus;
use common::ports::hash::Hash;
use common::ports::source_adapter::AdapterRegistry;
use common::storage::db::SurrealDbClient;
use common::utils::config::{CircuitBreakerConfig, ConcurrencyRetryConfig, HealthConfig, RetryConfig};
use resilience::CircuitBreaker;
use scheduler::Scheduler;

use crate::dedup::DedupCache;

#[derive(Clone)]
pub struct PipelineServices {
    pub db: Arc<SurrealDbClient>,
    pub events: Arc<EventBus>,
    pub adapters: Arc<AdapterRegistry>,
    pub hasher: Arc<dyn Hash>,
    pub dedup: Arc<DedupCache>,
    pub scheduler: Scheduler,
    pub retry_config: RetryConfig,
    pub circuit_breaker_config: CircuitBreakerConfig,
    pub health_config: HealthConfig,
    pub concurrency_retry_config: ConcurrencyRetryConfig,
    breakers: Arc<Mutex<HashMap<String, CircuitBreaker>>>,
}

impl PipelineServices {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<SurrealDbClient>,
        events: Arc<EventBus>,
        adapters: Arc<AdapterRegistry>,
        hasher: Arc<dyn Hash>,
        scheduler: Scheduler,
        retry_config: RetryConfig,
        circuit_breaker_config: CircuitBreakerConfig,
        health_config: HealthConfig,
        concurrency_retry_config: ConcurrencyRetryConfig,
    ) -> Self {
        Self {
            db,
            events,
            adapters,
            hasher,
            dedup: Arc::new(DedupCache::new()),
            scheduler,
            retry_config,
            circuit_breaker_config,
            health_config,
            concurrency_retry_config,
            breakers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// One circuit breaker per source, created lazily (§4.3, §4.6).
    pub fn breaker_for(&self, source_id: &str) -> CircuitBreaker {
        let mut breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        breakers
            .entry(source_id.to_string())
            .or_insert_with(|| CircuitBreaker::new(self.circuit_breaker_config.clone()))
            .clone()
    }
}
