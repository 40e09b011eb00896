//! One-shot and recurring job scheduler (§4.2).
//!
//! The job table is an in-memory singleton guarded by a `std::sync::Mutex`
//! (§9: "all shared mutable state resides in the persistence store... MUST
//! be safe under concurrent access"); firing happens on spawned `tokio`
//! tasks rather than a polling loop, since callbacks here are arbitrary
//! futures rather than a single DB-backed lease-claim query like the
//! teacher's `run_worker_loop`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use common::error::AppError;
use tokio::task::JoinHandle;
use tokio::time::Duration;

struct Entry {
    handle: JoinHandle<()>,
}

/// Thread-safe, clonable handle to the scheduler's job table. Cloning
/// shares the same underlying registry.
#[derive(Clone, Default)]
pub struct Scheduler {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

fn delay_until(fire_at: DateTime<Utc>) -> Duration {
    let now = Utc::now();
    if fire_at <= now {
        return Duration::from_millis(0);
    }
    (fire_at - now).to_std().unwrap_or(Duration::from_millis(0))
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback to fire once at `fire_at`. A `fire_at` in the
    /// past fires with delay clamped to zero rather than rejected.
    pub fn schedule_once<F, Fut>(
        &self,
        id: impl Into<String>,
        fire_at: DateTime<Utc>,
        callback: F,
    ) -> Result<(), AppError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let id = id.into();
        self.claim(&id)?;

        let delay = delay_until(fire_at);
        let entries = self.entries.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = callback().await {
                tracing::error!(error = %err, job_id = %task_id, "one-shot callback failed");
            }
            entries.lock().unwrap_or_else(|e| e.into_inner()).remove(&task_id);
        });

        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Entry { handle });
        Ok(())
    }

    /// Registers a callback to fire every `interval`, starting one
    /// `interval` from now. `interval` must be strictly positive.
    pub fn schedule_recurring<F, Fut>(
        &self,
        id: impl Into<String>,
        interval: Duration,
        callback: F,
    ) -> Result<(), AppError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        if interval.is_zero() {
            return Err(AppError::Validation(
                "recurring interval must be strictly positive".to_string(),
            ));
        }
        let id = id.into();
        self.claim(&id)?;

        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(err) = callback().await {
                    tracing::error!(error = %err, job_id = %task_id, "recurring callback failed");
                }
            }
        });

        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Entry { handle });
        Ok(())
    }

    fn claim(&self, id: &str) -> Result<(), AppError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.contains_key(id) {
            return Err(AppError::AlreadyScheduled(id.to_string()));
        }
        Ok(())
    }

    /// Removes and aborts the registration for `id`. Returns `true` only on
    /// the call that actually found and removed it.
    pub fn cancel(&self, id: &str) -> bool {
        let removed = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        match removed {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    /// Clears every registration, aborting in-flight tasks. Safe to call
    /// repeatedly and safe to call on an empty table (shutdown path).
    pub fn cancel_all(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for (_, entry) in entries.drain() {
            entry.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration as StdDuration;

    #[tokio::test(start_paused = true)]
    async fn one_shot_fires_and_then_deregisters() {
        let scheduler = Scheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();

        scheduler
            .schedule_once("job-1", Utc::now() + chrono::Duration::milliseconds(100), move || {
                let f = f.clone();
                async move {
                    f.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        assert!(scheduler.is_scheduled("job-1"));
        tokio::time::advance(StdDuration::from_millis(150)).await;
        tokio::task::yield_now().await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_scheduled("job-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn past_fire_at_clamps_to_zero_delay() {
        let scheduler = Scheduler::new();
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();

        scheduler
            .schedule_once("job-past", Utc::now() - chrono::Duration::seconds(5), move || {
                let f = f.clone();
                async move {
                    f.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .unwrap();

        tokio::task::yield_now().await;
        tokio::time::advance(StdDuration::from_millis(1)).await;
        tokio::task::yield_now().await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_id_fails_with_already_scheduled() {
        let scheduler = Scheduler::new();
        scheduler
            .schedule_once("dup", Utc::now(), || async { Ok(()) })
            .unwrap();

        let err = scheduler
            .schedule_once("dup", Utc::now(), || async { Ok(()) })
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyScheduled(id) if id == "dup"));
    }

    #[tokio::test]
    async fn zero_interval_recurring_is_rejected() {
        let scheduler = Scheduler::new();
        let err = scheduler
            .schedule_recurring("recur", Duration::from_millis(0), || async { Ok(()) })
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn recurring_keeps_firing_after_a_callback_error() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        scheduler
            .schedule_recurring("recur-err", Duration::from_millis(50), move || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                    if n == 1 {
                        Err(AppError::Validation("transient".to_string()))
                    } else {
                        Ok(())
                    }
                }
            })
            .unwrap();

        tokio::time::advance(StdDuration::from_millis(170)).await;
        tokio::task::yield_now().await;

        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn cancel_returns_true_only_on_first_call() {
        let scheduler = Scheduler::new();
        scheduler
            .schedule_once("once", Utc::now() + chrono::Duration::seconds(60), || async {
                Ok(())
            })
            .unwrap();

        assert!(scheduler.cancel("once"));
        assert!(!scheduler.cancel("once"));
    }

    #[tokio::test]
    async fn cancel_all_clears_the_table_and_is_safe_when_empty() {
        let scheduler = Scheduler::new();
        scheduler.cancel_all();

        scheduler
            .schedule_once("a", Utc::now() + chrono::Duration::seconds(60), || async { Ok(()) })
            .unwrap();
        scheduler
            .schedule_recurring("b", Duration::from_secs(60), || async { Ok(()) })
            .unwrap();

        scheduler.cancel_all();
        assert!(!scheduler.is_scheduled("a"));
        assert!(!scheduler.is_scheduled("b"));
    }
}
