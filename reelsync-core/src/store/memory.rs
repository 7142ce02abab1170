use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reelsync_model::{KeyChange, StoreChange, StoreDelta, StoreSnapshot, StoreValue};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::ports::SettingsStore;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// In-process settings store with the same semantics as the extension-backed
/// one: writes are atomic batches and every subscriber, the writer included,
/// receives a change notification per write.
///
/// Clones share state, so two clones of one `MemoryStore` behave like two
/// tabs of the same profile.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    values: Mutex<HashMap<String, StoreValue>>,
    changes: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                values: Mutex::new(HashMap::new()),
                changes,
            }),
        }
    }

    /// A store pre-populated with the given wire-keyed values.
    pub fn seeded(entries: impl IntoIterator<Item = (String, StoreValue)>) -> Self {
        let store = Self::new();
        store.inner.values.lock().extend(entries);
        store
    }

    fn snapshot_locked(values: &HashMap<String, StoreValue>) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new();
        for (key, value) in values {
            snapshot.insert_raw(key.clone(), value.clone());
        }
        snapshot
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("len", &self.inner.values.lock().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn read_all(&self) -> Result<StoreSnapshot> {
        let values = self.inner.values.lock();
        Ok(Self::snapshot_locked(&values))
    }

    async fn write(&self, delta: StoreDelta) -> Result<()> {
        if delta.is_empty() {
            return Ok(());
        }
        let change = {
            let mut values = self.inner.values.lock();
            let mut changes = Vec::new();
            for (key, value) in delta.iter() {
                let old = values.insert(key.as_str().to_string(), value.clone());
                changes.push(KeyChange {
                    key: key.as_str().to_string(),
                    old,
                    new: Some(value.clone()),
                });
            }
            StoreChange {
                changes,
                snapshot: Self::snapshot_locked(&values),
            }
        };
        // Nobody listening is fine.
        let _ = self.inner.changes.send(change);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use reelsync_model::StoreKey;

    use super::*;

    #[tokio::test]
    async fn writer_receives_its_own_change_echo() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store
            .write(StoreDelta::new().with(StoreKey::VolumeLevel, 0.4))
            .await
            .expect("write");

        let change = rx.recv().await.expect("change");
        assert!(change.touches(StoreKey::VolumeLevel));
        assert_eq!(
            change.snapshot.get(StoreKey::VolumeLevel),
            Some(&StoreValue::Number(0.4))
        );
    }

    #[tokio::test]
    async fn clones_share_state_like_tabs_of_one_profile() {
        let tab_a = MemoryStore::new();
        let tab_b = tab_a.clone();
        let mut rx_b = tab_b.subscribe();

        tab_a
            .write(StoreDelta::new().with(StoreKey::PlaybackRate, 2.0))
            .await
            .expect("write");

        let change = rx_b.recv().await.expect("change");
        assert!(change.touches(StoreKey::PlaybackRate));
        let snapshot = tab_b.read_all().await.expect("read");
        assert_eq!(
            snapshot.get(StoreKey::PlaybackRate),
            Some(&StoreValue::Number(2.0))
        );
    }

    #[tokio::test]
    async fn batch_write_notifies_once_with_every_key() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store
            .write(
                StoreDelta::new()
                    .with(StoreKey::VolumeLevel, 0.8)
                    .with(StoreKey::PlaybackRate, 1.5),
            )
            .await
            .expect("write");

        let change = rx.recv().await.expect("change");
        assert_eq!(change.changes.len(), 2);
        assert!(rx.try_recv().is_err());
    }
}
