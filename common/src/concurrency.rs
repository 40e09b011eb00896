//! Bounded retry-on-`Concurrency` helper (§4.6, §5: "3 attempts, 50ms,
//! 100ms, 200ms backoff before surfacing"), shared by every pipeline that
//! re-mutates an aggregate it just loaded.

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::utils::config::ConcurrencyRetryConfig;

/// Retries `op` (a full load-mutate-save cycle) while it keeps failing
/// with [`AppError::Concurrency`], up to `config.attempts` times, backing
/// off by `config.backoff_ms[attempt]` (or the last entry once exhausted)
/// between tries. Any other error returns immediately.
pub async fn retry_on_concurrency<F, Fut, T>(
    config: &ConcurrencyRetryConfig,
    mut op: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0_usize;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err @ AppError::Concurrency { .. }) => {
                attempt += 1;
                if attempt >= config.attempts as usize {
                    return Err(err);
                }
                let backoff_ms = config
                    .backoff_ms
                    .get(attempt - 1)
                    .copied()
                    .or_else(|| config.backoff_ms.last().copied())
                    .unwrap_or(200);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            Err(other) => return Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn config() -> ConcurrencyRetryConfig {
        ConcurrencyRetryConfig {
            attempts: 3,
            backoff_ms: vec![1, 1, 1],
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_conflicts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result = retry_on_concurrency(&config(), move || {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 2 {
                    Err(AppError::Concurrency {
                        table: "t",
                        id: "1".to_string(),
                    })
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_attempts() {
        let result: Result<(), AppError> = retry_on_concurrency(&config(), || async {
            Err(AppError::Concurrency {
                table: "t",
                id: "1".to_string(),
            })
        })
        .await;
        assert!(matches!(result, Err(AppError::Concurrency { .. })));
    }

    #[tokio::test]
    async fn non_concurrency_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let result: Result<(), AppError> = retry_on_concurrency(&config(), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(AppError::Validation("bad".to_string()))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
