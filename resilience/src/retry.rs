//! Retry with exponential backoff and optional jitter (§4.3).
//!
//! The delay formula is computed by hand to match the spec's exact
//! `min(initialDelay * multiplier^n, maxDelay)` rule rather than
//! `tokio_retry`'s own `ExponentialBackoff` iterator (whose integer
//! `factor` knob can't express a fractional multiplier); `tokio_retry`'s
//! `jitter` helper — "uniform in `[0, computed]`" is exactly what it
//! does — is reused rather than hand-rolled, the same way the teacher
//! reaches for it in `text_chunk.rs::update_all_embeddings`.

use std::future::Future;
use std::time::{Duration, Instant};

use common::error::AppError;
use common::utils::config::RetryConfig;
use tokio_retry::strategy::jitter;

/// Outcome of a retried operation: mirrors the spec's
/// `{success, value|error, attempts, totalTimeMs}` shape exactly.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub success: bool,
    pub value: Option<T>,
    pub error: Option<AppError>,
    pub attempts: u32,
    pub total_time_ms: u64,
}

impl<T> RetryOutcome<T> {
    /// Consumes the outcome, yielding its error on failure or the
    /// original success value on success — for callers that just want a
    /// `Result` back.
    pub fn into_result(self) -> Result<T, AppError> {
        match self.value {
            Some(value) => Ok(value),
            None => Err(self
                .error
                .unwrap_or_else(|| AppError::Unknown(anyhow::anyhow!("retry exhausted with no error recorded")))),
        }
    }
}

fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let computed = config.initial_delay_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped_ms = computed.min(config.max_delay_ms as f64).max(0.0);
    let capped = Duration::from_millis(capped_ms.round() as u64);
    if config.use_jitter {
        jitter(capped)
    } else {
        capped
    }
}

/// Runs `op` up to `config.max_attempts` times. Only errors for which
/// [`AppError::is_retryable`] is true are retried; a non-retryable error
/// returns immediately. Attempt `n` (0-based) waits
/// `min(initialDelay * multiplier^n, maxDelay)` before its attempt.
pub async fn execute<F, Fut, T>(config: &RetryConfig, mut op: F) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let start = Instant::now();
    let mut attempts = 0_u32;
    let mut last_err = None;

    loop {
        attempts += 1;
        match op().await {
            Ok(value) => {
                return RetryOutcome {
                    success: true,
                    value: Some(value),
                    error: None,
                    attempts,
                    total_time_ms: start.elapsed().as_millis() as u64,
                };
            }
            Err(err) => {
                let retryable = err.is_retryable();
                last_err = Some(err);
                if !retryable || attempts >= config.max_attempts {
                    break;
                }
                tokio::time::sleep(backoff_delay(config, attempts - 1)).await;
            }
        }
    }

    RetryOutcome {
        success: false,
        value: None,
        error: last_err,
        attempts,
        total_time_ms: start.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn no_jitter_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 10,
            backoff_multiplier: 2.0,
            max_delay_ms: 1_000,
            use_jitter: false,
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_try_without_retrying() {
        let config = no_jitter_config();
        let outcome = execute(&config, || async { Ok::<_, AppError>(42) }).await;

        assert!(outcome.success);
        assert_eq!(outcome.value, Some(42));
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let config = no_jitter_config();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let outcome = execute(&config, move || {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(AppError::network("connection reset"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.value, Some(3));
    }

    #[tokio::test]
    async fn non_retryable_error_fails_on_first_attempt() {
        let config = no_jitter_config();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let outcome = execute::<_, _, ()>(&config, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(AppError::parsing("malformed input"))
            }
        })
        .await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausting_all_attempts_returns_the_last_error() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            backoff_multiplier: 2.0,
            max_delay_ms: 10,
            use_jitter: false,
        };

        let outcome = execute::<_, _, ()>(&config, || async {
            Err(AppError::timeout("upstream took too long"))
        })
        .await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert!(matches!(
            outcome.error,
            Some(AppError::Transient {
                kind: common::error::TransientKind::Timeout,
                ..
            })
        ));
    }
}
