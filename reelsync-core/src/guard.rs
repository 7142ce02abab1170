//! Failure containment for batched operations.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use crate::error::Result;
use crate::telemetry::Telemetry;

/// Wraps fallible operations so one failure is logged, counted, and
/// returned to the immediate caller without escaping further.
///
/// Loops over videos run each body through the guard and continue on error;
/// the failed element is skipped and the batch completes. Nothing inside a
/// session may take the whole page down.
#[derive(Clone)]
pub struct FailureGuard {
    telemetry: Arc<Telemetry>,
}

impl fmt::Debug for FailureGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureGuard").finish_non_exhaustive()
    }
}

impl FailureGuard {
    pub fn new(telemetry: Arc<Telemetry>) -> Self {
        Self { telemetry }
    }

    /// Runs an async operation under the guard. `operation` is the short
    /// name used in the log line and the error counter.
    pub async fn run<T, F, Fut>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match f().await {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(operation, "operation failed: {err}");
                self.telemetry.count_error(operation);
                Err(err)
            }
        }
    }

    /// Synchronous variant for port calls that do not await.
    pub fn run_sync<T>(
        &self,
        operation: &str,
        f: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        match f() {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(operation, "operation failed: {err}");
                self.telemetry.count_error(operation);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reelsync_model::{StoreKey, StoreValue};

    use super::*;
    use crate::error::SyncError;
    use crate::ports::SettingsStore;
    use crate::store::{MemoryStore, PreferenceStore};
    use crate::tuning::EngineTuning;

    fn guard_over(store: &MemoryStore) -> FailureGuard {
        let telemetry = Telemetry::new(
            PreferenceStore::new(Arc::new(store.clone())),
            &EngineTuning::default(),
        );
        FailureGuard::new(Arc::new(telemetry))
    }

    #[tokio::test]
    async fn failures_are_counted_and_returned() {
        let store = MemoryStore::new();
        let guard = guard_over(&store);

        let result: Result<()> = guard
            .run("applySettings", || async {
                Err(SyncError::Platform("element detached".into()))
            })
            .await;
        assert!(result.is_err());

        let ok: Result<u32> = guard.run("applySettings", || async { Ok(7) }).await;
        assert_eq!(ok.expect("guarded ok"), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn error_counter_lands_in_the_store() {
        let store = MemoryStore::new();
        let guard = guard_over(&store);

        let _: Result<()> = guard
            .run("muteSync.locate", || async {
                Err(SyncError::NotFound("no control".into()))
            })
            .await;

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;

        let snapshot = store.read_all().await.expect("read");
        let counters = snapshot
            .get(StoreKey::UsageStats)
            .and_then(StoreValue::as_counters)
            .expect("counters written");
        assert_eq!(counters.get("muteSync.locate.error"), Some(&1));
    }

    #[tokio::test]
    async fn batch_continues_past_one_guarded_failure() {
        let store = MemoryStore::new();
        let guard = guard_over(&store);

        let mut applied = Vec::new();
        for index in 0..3 {
            let result = guard
                .run("applySettings", || async move {
                    if index == 1 {
                        Err(SyncError::Platform("detached".into()))
                    } else {
                        Ok(index)
                    }
                })
                .await;
            if let Ok(index) = result {
                applied.push(index);
            }
        }
        assert_eq!(applied, vec![0, 2]);
    }
}
