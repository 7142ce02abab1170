use async_trait::async_trait;
use reelsync_model::{StoreChange, StoreDelta, StoreSnapshot};
use tokio::sync::broadcast;

use crate::error::Result;

/// Persistent key/value settings storage shared by every tab of the host
/// application.
///
/// Implementations are expected to deliver a [`StoreChange`] to every
/// subscriber for every successful `write`, including the subscriber that
/// issued the write. The reconciliation engine relies on that echo to keep
/// its self-notification handling in one code path.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Reads every stored key in one round trip.
    async fn read_all(&self) -> Result<StoreSnapshot>;

    /// Applies a batch of key writes atomically.
    async fn write(&self, delta: StoreDelta) -> Result<()>;

    /// Subscribes to change notifications for all keys.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}
