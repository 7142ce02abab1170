//! Usage counters and install bookkeeping.
//!
//! Counter increments accumulate in memory and flush to the store on a
//! debounce, so hotkey bursts cost one write instead of dozens. Flushes
//! read-merge-write: the pending deltas are added onto whatever the record
//! holds at flush time, which keeps concurrent tabs from erasing each
//! other's counts.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use reelsync_model::{StoreDelta, StoreKey, UsageStats};
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{PreferenceStore, resolve_telemetry};
use crate::timing::Debouncer;
use crate::tuning::EngineTuning;

/// Counter and version bookkeeping service.
pub struct Telemetry {
    store: PreferenceStore,
    pending: Arc<Mutex<UsageStats>>,
    flusher: Debouncer<()>,
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("pending", &*self.pending.lock())
            .finish_non_exhaustive()
    }
}

impl Telemetry {
    pub fn new(store: PreferenceStore, tuning: &EngineTuning) -> Self {
        let pending = Arc::new(Mutex::new(UsageStats::new()));
        let flusher = {
            let store = store.clone();
            let pending = Arc::clone(&pending);
            Debouncer::spawn(tuning.telemetry_flush_debounce, move |_ticks: Vec<()>| {
                let store = store.clone();
                let pending = Arc::clone(&pending);
                async move {
                    if let Err(err) = flush_counters(&store, &pending).await {
                        warn!("usage counter flush failed: {err}");
                    }
                }
            })
        };
        Self {
            store,
            pending,
            flusher,
        }
    }

    /// Increments a named counter and schedules a flush.
    pub fn count(&self, name: &str) {
        self.pending.lock().increment(name);
        self.flusher.push(());
    }

    /// Increments the error counter for a failed operation.
    pub fn count_error(&self, operation: &str) {
        self.count(&format!("{operation}.error"));
    }

    /// Writes any pending counters immediately. Called on page hide, where
    /// the debounce window would outlive the page.
    pub async fn flush_now(&self) -> Result<()> {
        flush_counters(&self.store, &self.pending).await
    }

    /// Records the running version in the install history. First sighting
    /// of the record stamps the install time; a version change appends to
    /// the history and stamps the update time.
    pub async fn record_version(&self, version: &str) -> Result<()> {
        let snapshot = self.store.snapshot().await?;
        let record = resolve_telemetry(&snapshot);
        let now = chrono::Utc::now().timestamp_millis();

        let mut delta = StoreDelta::new();
        if record.initial_install_time == 0 {
            delta.set(StoreKey::InstallTime, now);
        }
        if record.version_history.last().map(String::as_str) != Some(version) {
            let mut history = record.version_history.clone();
            history.push(version.to_string());
            delta.set(StoreKey::VersionHistory, history);
            if !record.version_history.is_empty() {
                delta.set(StoreKey::UpdateTime, now);
            }
            debug!(version, "recorded version change");
        }
        self.store.write(delta).await
    }
}

async fn flush_counters(
    store: &PreferenceStore,
    pending: &Mutex<UsageStats>,
) -> Result<()> {
    let taken = {
        let mut pending = pending.lock();
        if pending.is_empty() {
            return Ok(());
        }
        std::mem::take(&mut *pending)
    };

    let snapshot = store.snapshot().await?;
    let mut merged = resolve_telemetry(&snapshot).usage_stats;
    for (name, count) in taken.iter() {
        merged.add(name, count);
    }
    store
        .write(StoreDelta::new().with(StoreKey::UsageStats, merged))
        .await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reelsync_model::StoreValue;

    use super::*;
    use crate::ports::SettingsStore;
    use crate::store::MemoryStore;

    fn telemetry_over(store: &MemoryStore) -> Telemetry {
        Telemetry::new(
            PreferenceStore::new(Arc::new(store.clone())),
            &EngineTuning::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn counter_burst_flushes_once_merged() {
        let store = MemoryStore::new();
        let telemetry = telemetry_over(&store);

        telemetry.count("volume.applied");
        telemetry.count("volume.applied");
        telemetry.count("rate.applied");

        tokio::time::sleep(Duration::from_secs(2)).await;

        let snapshot = store.read_all().await.expect("read");
        let counters = snapshot
            .get(StoreKey::UsageStats)
            .and_then(StoreValue::as_counters)
            .expect("counters written");
        assert_eq!(counters.get("volume.applied"), Some(&2));
        assert_eq!(counters.get("rate.applied"), Some(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_merges_onto_concurrent_writes() {
        let store = MemoryStore::new();
        let telemetry = telemetry_over(&store);

        telemetry.count("mute.synced");
        // Another tab flushes its own count before ours lands.
        let mut other_tab = UsageStats::new();
        other_tab.increment("mute.synced");
        store
            .write(StoreDelta::new().with(StoreKey::UsageStats, other_tab))
            .await
            .expect("other tab write");

        telemetry.flush_now().await.expect("flush");

        let snapshot = store.read_all().await.expect("read");
        let counters = snapshot
            .get(StoreKey::UsageStats)
            .and_then(StoreValue::as_counters)
            .expect("counters written");
        assert_eq!(counters.get("mute.synced"), Some(&2));
    }

    #[tokio::test]
    async fn first_version_record_stamps_install_time_only() {
        let store = MemoryStore::new();
        let telemetry = telemetry_over(&store);

        telemetry.record_version("1.0.0").await.expect("record");

        let snapshot = store.read_all().await.expect("read");
        let record = resolve_telemetry(&snapshot);
        assert!(record.initial_install_time > 0);
        assert_eq!(record.most_recent_update_time, 0);
        assert_eq!(record.version_history, vec!["1.0.0".to_string()]);
    }

    #[tokio::test]
    async fn version_change_appends_and_stamps_update_time() {
        let store = MemoryStore::new();
        let telemetry = telemetry_over(&store);

        telemetry.record_version("1.0.0").await.expect("record");
        telemetry.record_version("1.1.0").await.expect("record");
        // Same version again is a no-op.
        telemetry.record_version("1.1.0").await.expect("record");

        let snapshot = store.read_all().await.expect("read");
        let record = resolve_telemetry(&snapshot);
        assert_eq!(
            record.version_history,
            vec!["1.0.0".to_string(), "1.1.0".to_string()]
        );
        assert!(record.most_recent_update_time > 0);
    }
}
