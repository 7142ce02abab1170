use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reelsync_model::{SettingsDocument, StoreDelta, StoreKey};
use tracing::{debug, warn};

use crate::error::Result;
use crate::ports::NoticeSink;
use crate::store::PreferenceStore;
use crate::telemetry::Telemetry;

const NOTICE_DURATION: Duration = Duration::from_secs(4);

/// Settings backup and restore through a flat JSON document.
///
/// Export reads the whole record; import writes it back with per-key
/// default substitution, so a file from an older version restores what it
/// has and defaults the rest. Only the envelope is strict: a payload that
/// is not JSON at all is rejected without touching the record.
#[derive(Clone)]
pub struct SettingsTransfer {
    store: PreferenceStore,
    notices: Arc<dyn NoticeSink>,
    telemetry: Arc<Telemetry>,
}

impl fmt::Debug for SettingsTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsTransfer").finish_non_exhaustive()
    }
}

impl SettingsTransfer {
    pub fn new(
        store: PreferenceStore,
        notices: Arc<dyn NoticeSink>,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self {
            store,
            notices,
            telemetry,
        }
    }

    /// Serializes the current record as pretty-printed JSON.
    pub async fn export_string(&self) -> Result<String> {
        let state = self.store.load().await?;
        let document =
            SettingsDocument::from_state(&state.preferences, &state.telemetry);
        let json = serde_json::to_string_pretty(&document)?;
        self.telemetry.count("settings.exported");
        Ok(json)
    }

    /// Parses a settings document and writes it to the record.
    ///
    /// Preference keys always write, resolved against defaults. Telemetry
    /// keys write only when the document carries any of them; restoring
    /// settings must not reset install bookkeeping.
    pub async fn import_string(&self, payload: &str) -> Result<()> {
        let document: SettingsDocument = match serde_json::from_str(payload) {
            Ok(document) => document,
            Err(err) => {
                warn!("settings import rejected: {err}");
                self.telemetry.count_error("settings.import");
                self.notices.show_notice(
                    "Import failed: not a valid settings file",
                    NOTICE_DURATION,
                );
                return Err(err.into());
            }
        };

        let prefs = document.resolve_preferences();
        let mut delta = StoreDelta::new()
            .with(StoreKey::RememberVolume, prefs.remember_volume)
            .with(StoreKey::RememberRate, prefs.remember_rate)
            .with(StoreKey::Debug, prefs.debug)
            .with(StoreKey::VolumeLevel, prefs.volume_level.value())
            .with(StoreKey::PlaybackRate, prefs.playback_rate.value())
            .with(StoreKey::VolumeStep, prefs.volume_step)
            .with(StoreKey::RateStep, prefs.rate_step);
        if let Some(telemetry) = document.resolve_telemetry() {
            delta.set(StoreKey::UsageStats, telemetry.usage_stats);
            delta.set(StoreKey::VersionHistory, telemetry.version_history);
            delta.set(StoreKey::InstallTime, telemetry.initial_install_time);
            delta.set(StoreKey::UpdateTime, telemetry.most_recent_update_time);
        }
        self.store.write(delta).await?;

        self.telemetry.count("settings.imported");
        self.notices
            .show_notice("Settings imported", NOTICE_DURATION);
        Ok(())
    }

    pub async fn export_to_file(&self, path: &Path) -> Result<()> {
        let json = self.export_string().await?;
        tokio::fs::write(path, json).await?;
        debug!(path = %path.display(), "settings exported");
        Ok(())
    }

    pub async fn import_from_file(&self, path: &Path) -> Result<()> {
        let payload = tokio::fs::read_to_string(path).await?;
        self.import_string(&payload).await
    }
}
