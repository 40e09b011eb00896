//! `SourceConfiguration` aggregate (§3, §4.6): health bookkeeping and the
//! auto-disable latch.

use chrono::{DateTime, Utc};
use common::utils::config::HealthConfig;
use common::versioned_aggregate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceHealth {
    pub successes: u32,
    pub total_jobs: u32,
    pub success_rate: f64,
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl SourceHealth {
    pub fn is_unhealthy(&self, config: &HealthConfig) -> bool {
        (self.success_rate < config.unhealthy_success_rate_below
            && self.total_jobs >= config.unhealthy_min_total_jobs)
            || self.consecutive_failures >= config.unhealthy_consecutive_failures
    }
}

versioned_aggregate!(SourceConfiguration, "source_configurations", {
    source_type: String,
    name: String,
    config: Value,
    credentials: Vec<u8>,
    is_active: bool,
    health: SourceHealth,
    /// Set once health first crosses into unhealthy, to avoid re-emitting
    /// `SourceUnhealthy` on every subsequent failure (§3: "latched once
    /// per crossing"). Cleared when health recovers.
    unhealthy_latched: bool
});

impl SourceConfiguration {
    pub fn configure(
        source_id: String,
        source_type: String,
        name: String,
        config: Value,
        credentials: Vec<u8>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: source_id,
            created_at: now,
            updated_at: now,
            version: 0,
            source_type,
            name,
            config,
            credentials,
            is_active: true,
            health: SourceHealth::default(),
            unhealthy_latched: false,
        }
    }

    pub fn record_success(&mut self, health_config: &HealthConfig) {
        self.health.successes += 1;
        self.health.total_jobs += 1;
        self.recompute_success_rate();
        self.health.consecutive_failures = 0;
        self.health.last_success_at = Some(Utc::now());
        if self.unhealthy_latched && !self.health.is_unhealthy(health_config) {
            self.unhealthy_latched = false;
        }
        self.updated_at = Utc::now();
    }

    pub fn record_failure(&mut self, health_config: &HealthConfig) {
        let _ = health_config;
        self.health.total_jobs += 1;
        self.health.consecutive_failures += 1;
        self.recompute_success_rate();
        self.health.last_failure_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    fn recompute_success_rate(&mut self) {
        self.health.success_rate = if self.health.total_jobs == 0 {
            0.0
        } else {
            f64::from(self.health.successes) / f64::from(self.health.total_jobs) * 100.0
        };
    }

    pub fn is_unhealthy(&self, health_config: &HealthConfig) -> bool {
        self.health.is_unhealthy(health_config)
    }

    /// True exactly once per crossing into unhealthy.
    pub fn crossed_into_unhealthy(&self, health_config: &HealthConfig) -> bool {
        !self.unhealthy_latched && self.health.is_unhealthy(health_config)
    }

    pub fn latch_unhealthy(&mut self) {
        self.unhealthy_latched = true;
        self.updated_at = Utc::now();
    }

    /// Soft delete: no row removal, only `isActive = false`.
    pub fn disable(&mut self, _reason: &str) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health_config() -> HealthConfig {
        HealthConfig {
            unhealthy_success_rate_below: 50.0,
            unhealthy_min_total_jobs: 10,
            unhealthy_consecutive_failures: 5,
        }
    }

    fn source() -> SourceConfiguration {
        SourceConfiguration::configure(
            "source-1".to_string(),
            "RSS".to_string(),
            "Example feed".to_string(),
            Value::Null,
            Vec::new(),
        )
    }

    #[test]
    fn success_rate_is_successes_over_total_jobs() {
        let cfg = health_config();
        let mut source = source();
        source.record_success(&cfg);
        source.record_success(&cfg);
        source.record_failure(&cfg);
        assert!((source.health.success_rate - (200.0 / 3.0)).abs() < 1e-9);
        assert_eq!(source.health.consecutive_failures, 1);
    }

    #[test]
    fn record_success_resets_consecutive_failures() {
        let cfg = health_config();
        let mut source = source();
        for _ in 0..3 {
            source.record_failure(&cfg);
        }
        assert_eq!(source.health.consecutive_failures, 3);
        source.record_success(&cfg);
        assert_eq!(source.health.consecutive_failures, 0);
    }

    #[test]
    fn unhealthy_by_consecutive_failures_regardless_of_total_jobs() {
        let cfg = health_config();
        let mut source = source();
        for _ in 0..5 {
            source.record_failure(&cfg);
        }
        assert!(source.is_unhealthy(&cfg));
    }

    #[test]
    fn unhealthy_by_low_success_rate_requires_minimum_jobs() {
        let cfg = health_config();
        let mut source = source();
        source.record_failure(&cfg);
        source.record_failure(&cfg);
        // Only 2 jobs so far: low rate but below the minimum-jobs floor.
        assert!(!source.is_unhealthy(&cfg));
        for _ in 0..8 {
            source.record_failure(&cfg);
        }
        assert!(source.is_unhealthy(&cfg));
    }

    #[test]
    fn crossing_into_unhealthy_latches_once() {
        let cfg = health_config();
        let mut source = source();
        for _ in 0..5 {
            source.record_failure(&cfg);
        }
        assert!(source.crossed_into_unhealthy(&cfg));
        source.latch_unhealthy();
        assert!(!source.crossed_into_unhealthy(&cfg));

        source.record_failure(&cfg);
        assert!(!source.crossed_into_unhealthy(&cfg));
    }

    #[test]
    fn recovering_health_clears_the_latch() {
        let cfg = health_config();
        let mut source = source();
        for _ in 0..5 {
            source.record_failure(&cfg);
        }
        source.latch_unhealthy();
        for _ in 0..20 {
            source.record_success(&cfg);
        }
        assert!(!source.is_unhealthy(&cfg));
        assert!(!source.unhealthy_latched);
    }

    #[test]
    fn disable_is_soft() {
        let mut source = source();
        source.disable("Automatic disable due to health issues");
        assert!(!source.is_active);
    }
}
