use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Tunables for the `Retry` component (§4.3). Defaults match the spec
/// exactly: 5 attempts, 1s initial delay, x2 backoff, 60s cap, jitter on.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_use_jitter")]
    pub use_jitter: bool,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_initial_delay_ms() -> u64 {
    1_000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_max_delay_ms() -> u64 {
    60_000
}
fn default_use_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            use_jitter: default_use_jitter(),
        }
    }
}

/// Tunables for the `CircuitBreaker` component (§4.3).
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    #[serde(default = "default_open_duration_ms")]
    pub open_duration_ms: u64,
}

fn default_failure_threshold() -> u32 {
    5
}
fn default_success_threshold() -> u32 {
    2
}
fn default_open_duration_ms() -> u64 {
    60_000
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            success_threshold: default_success_threshold(),
            open_duration_ms: default_open_duration_ms(),
        }
    }
}

/// Source-health auto-disable thresholds (§4.6, Open Question 2, resolved
/// as configuration here rather than left as inferred defaults).
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HealthConfig {
    #[serde(default = "default_unhealthy_success_rate")]
    pub unhealthy_success_rate_below: f64,
    #[serde(default = "default_unhealthy_min_jobs")]
    pub unhealthy_min_total_jobs: u32,
    #[serde(default = "default_unhealthy_consecutive_failures")]
    pub unhealthy_consecutive_failures: u32,
}

fn default_unhealthy_success_rate() -> f64 {
    50.0
}
fn default_unhealthy_min_jobs() -> u32 {
    10
}
fn default_unhealthy_consecutive_failures() -> u32 {
    5
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            unhealthy_success_rate_below: default_unhealthy_success_rate(),
            unhealthy_min_total_jobs: default_unhealthy_min_jobs(),
            unhealthy_consecutive_failures: default_unhealthy_consecutive_failures(),
        }
    }
}

/// Refinement chunking + quality tunables (§4.5).
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RefinementConfig {
    #[serde(default = "default_chunk_size_tokens")]
    pub chunk_size_tokens: usize,
    #[serde(default = "default_chunk_overlap_tokens")]
    pub chunk_overlap_tokens: usize,
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,
}

fn default_chunk_size_tokens() -> usize {
    512
}
fn default_chunk_overlap_tokens() -> usize {
    64
}
fn default_quality_threshold() -> f64 {
    0.3
}
fn default_chars_per_token() -> usize {
    4
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            chunk_size_tokens: default_chunk_size_tokens(),
            chunk_overlap_tokens: default_chunk_overlap_tokens(),
            quality_threshold: default_quality_threshold(),
            chars_per_token: default_chars_per_token(),
        }
    }
}

/// Concurrency-conflict retry policy for handlers that re-mutate an
/// aggregate they just observed (§5: "3 attempts, 50ms/100ms/200ms").
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ConcurrencyRetryConfig {
    #[serde(default = "default_concurrency_retry_attempts")]
    pub attempts: u32,
    #[serde(default = "default_concurrency_retry_backoff_ms")]
    pub backoff_ms: Vec<u64>,
}

fn default_concurrency_retry_attempts() -> u32 {
    3
}
fn default_concurrency_retry_backoff_ms() -> Vec<u64> {
    vec![50, 100, 200]
}

impl Default for ConcurrencyRetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_concurrency_retry_attempts(),
            backoff_ms: default_concurrency_retry_backoff_ms(),
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct AppConfig {
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    #[serde(default = "default_scheduler_poll_ms")]
    pub scheduler_poll_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub refinement: RefinementConfig,
    #[serde(default)]
    pub concurrency_retry: ConcurrencyRetryConfig,
}

fn default_scheduler_poll_ms() -> u64 {
    250
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            surrealdb_address: "mem://".to_string(),
            surrealdb_username: "root".to_string(),
            surrealdb_password: "root".to_string(),
            surrealdb_namespace: "pipeline".to_string(),
            surrealdb_database: "pipeline".to_string(),
            scheduler_poll_ms: default_scheduler_poll_ms(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            health: HealthConfig::default(),
            refinement: RefinementConfig::default(),
            concurrency_retry: ConcurrencyRetryConfig::default(),
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default().separator("__"))
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_config_matches_spec_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 5);
        assert_eq!(retry.initial_delay_ms, 1_000);
        assert!((retry.backoff_multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(retry.max_delay_ms, 60_000);
        assert!(retry.use_jitter);
    }

    #[test]
    fn default_health_thresholds_match_spec() {
        let health = HealthConfig::default();
        assert!((health.unhealthy_success_rate_below - 50.0).abs() < f64::EPSILON);
        assert_eq!(health.unhealthy_min_total_jobs, 10);
        assert_eq!(health.unhealthy_consecutive_failures, 5);
    }
}
