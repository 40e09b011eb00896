//! Circuit breaker (§4.3): `CLOSED -> OPEN -> HALF_OPEN -> CLOSED`.
//!
//! Grounded directly on the teacher pack's sibling resilience crate
//! (`saworbit-orbit/crates/core-resilience/src/circuit_breaker.rs`):
//! `Arc<Mutex<CircuitBreakerState>>` holding consecutive failure/success
//! counters plus a tri-state enum, `Open` carrying the instant the next
//! probe is admitted.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::error::AppError;
use common::utils::config::CircuitBreakerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    next_probe_at: Option<Instant>,
}

/// A single breaker instance guarding one external collaborator (one per
/// source adapter, per §4.6/§9's "consumers wrap the source adapter call
/// with breaker then retry").
#[derive(Clone)]
pub struct CircuitBreaker {
    config: Arc<CircuitBreakerConfig>,
    inner: Arc<Mutex<Inner>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: Arc::new(config),
            inner: Arc::new(Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                next_probe_at: None,
            })),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.with_fresh_state(|inner| inner.state)
    }

    /// Re-evaluates `OPEN -> HALF_OPEN` transitions against the clock, then
    /// runs `f` against the settled state under the same lock.
    fn with_fresh_state<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.state == CircuitState::Open {
            if let Some(next_probe) = inner.next_probe_at {
                if Instant::now() >= next_probe {
                    inner.state = CircuitState::HalfOpen;
                    inner.consecutive_successes = 0;
                    inner.next_probe_at = None;
                }
            }
        }
        f(&mut inner)
    }

    /// Checks whether a call is currently admitted, without running it.
    /// Returns [`AppError::CircuitOpen`] while still `OPEN`.
    pub fn allow_call(&self) -> Result<(), AppError> {
        self.with_fresh_state(|inner| match inner.state {
            CircuitState::Open => Err(AppError::CircuitOpen),
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
        })
    }

    fn on_success(&self) {
        self.with_fresh_state(|inner| match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                }
            }
            CircuitState::Open => {}
        });
    }

    fn on_failure(&self) {
        self.with_fresh_state(|inner| match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.next_probe_at =
                        Some(Instant::now() + Duration::from_millis(self.config.open_duration_ms));
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.consecutive_successes = 0;
                inner.next_probe_at =
                    Some(Instant::now() + Duration::from_millis(self.config.open_duration_ms));
            }
            CircuitState::Open => {}
        });
    }

    /// Runs `op` through the breaker: rejects immediately with
    /// [`AppError::CircuitOpen`] while open, otherwise runs the call and
    /// records its outcome. Only errors for which
    /// [`AppError::should_trip_breaker`] is true count as failures; a
    /// validation-style error passes through without affecting the state.
    pub async fn call<F, Fut, T>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, AppError>>,
    {
        self.allow_call()?;
        match op().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                if err.should_trip_breaker() {
                    self.on_failure();
                } else {
                    self.on_success();
                }
                Err(err)
            }
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.next_probe_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 2,
            open_duration_ms: 50,
        }
    }

    #[tokio::test]
    async fn opens_after_reaching_the_failure_threshold() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            let _ = breaker
                .call(|| async { Err::<(), _>(AppError::network("boom")) })
                .await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let err = breaker.call(|| async { Ok(()) }).await.unwrap_err();
        assert!(matches!(err, AppError::CircuitOpen));
    }

    #[tokio::test]
    async fn half_open_closes_after_success_threshold_consecutive_successes() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            let _ = breaker
                .call(|| async { Err::<(), _>(AppError::network("boom")) })
                .await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.call(|| async { Ok::<_, AppError>(()) }).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.call(|| async { Ok::<_, AppError>(()) }).await.unwrap();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn a_failure_in_half_open_reopens_and_resets_the_timer() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            let _ = breaker
                .call(|| async { Err::<(), _>(AppError::network("boom")) })
                .await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let _ = breaker
            .call(|| async { Err::<(), _>(AppError::network("boom again")) })
            .await;
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn non_breaker_tripping_errors_pass_through_without_counting() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..5 {
            let err = breaker
                .call(|| async { Err::<(), _>(AppError::Validation("bad input".to_string())) })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn reset_returns_to_closed_from_any_state() {
        let breaker = CircuitBreaker::new(config());
        for _ in 0..3 {
            let _ = breaker
                .call(|| async { Err::<(), _>(AppError::network("boom")) })
                .await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
