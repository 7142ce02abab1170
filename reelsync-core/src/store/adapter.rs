use std::fmt;
use std::sync::Arc;

use reelsync_model::{
    PlaybackRate, PreferenceSet, StoreChange, StoreDelta, StoreKey, StoreSnapshot,
    TelemetryRecord, UsageStats, Volume,
};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::Result;
use crate::ports::SettingsStore;

/// Typed state resolved from one store snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState {
    pub preferences: PreferenceSet,
    pub telemetry: TelemetryRecord,
}

/// Typed adapter over the raw settings store.
///
/// Every read resolves against built-in defaults key by key: an absent,
/// ill-typed, or out-of-range value falls back for that key alone and the
/// remaining keys still load. Legacy string-encoded numbers coerce.
#[derive(Clone)]
pub struct PreferenceStore {
    store: Arc<dyn SettingsStore>,
}

impl fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceStore").finish_non_exhaustive()
    }
}

impl PreferenceStore {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Reads and resolves the whole record.
    pub async fn load(&self) -> Result<StoreState> {
        let snapshot = self.store.read_all().await?;
        let state = StoreState {
            preferences: resolve_preferences(&snapshot),
            telemetry: resolve_telemetry(&snapshot),
        };
        debug!(
            volume = %state.preferences.volume_level,
            rate = %state.preferences.playback_rate,
            remember_volume = state.preferences.remember_volume,
            remember_rate = state.preferences.remember_rate,
            "loaded preferences"
        );
        Ok(state)
    }

    /// Raw snapshot, for callers that resolve themselves.
    pub async fn snapshot(&self) -> Result<StoreSnapshot> {
        self.store.read_all().await
    }

    pub async fn write(&self, delta: StoreDelta) -> Result<()> {
        if delta.is_empty() {
            return Ok(());
        }
        self.store.write(delta).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.store.subscribe()
    }
}

/// Resolves the preference keys of a snapshot, defaulting per key.
pub fn resolve_preferences(snapshot: &StoreSnapshot) -> PreferenceSet {
    let defaults = PreferenceSet::default();
    let mut prefs = defaults.clone();

    if let Some(remember) =
        snapshot.get(StoreKey::RememberVolume).and_then(|v| v.coerce_bool())
    {
        prefs.remember_volume = remember;
    }
    if let Some(remember) =
        snapshot.get(StoreKey::RememberRate).and_then(|v| v.coerce_bool())
    {
        prefs.remember_rate = remember;
    }
    if let Some(debug) = snapshot.get(StoreKey::Debug).and_then(|v| v.coerce_bool()) {
        prefs.debug = debug;
    }
    if let Some(volume) = snapshot
        .get(StoreKey::VolumeLevel)
        .and_then(|v| v.coerce_number())
        .and_then(Volume::try_new)
    {
        prefs.volume_level = volume;
    }
    if let Some(rate) = snapshot
        .get(StoreKey::PlaybackRate)
        .and_then(|v| v.coerce_number())
        .and_then(PlaybackRate::try_new)
    {
        prefs.playback_rate = rate;
    }
    if let Some(step) = snapshot
        .get(StoreKey::VolumeStep)
        .and_then(|v| v.coerce_number())
        .filter(|step| *step > 0.0)
    {
        prefs.volume_step = step;
    }
    if let Some(step) = snapshot
        .get(StoreKey::RateStep)
        .and_then(|v| v.coerce_number())
        .filter(|step| *step > 0.0)
    {
        prefs.rate_step = step;
    }

    prefs
}

/// Resolves the bookkeeping keys of a snapshot.
pub fn resolve_telemetry(snapshot: &StoreSnapshot) -> TelemetryRecord {
    let usage_stats = snapshot
        .get(StoreKey::UsageStats)
        .and_then(|v| v.as_counters())
        .map(|counters| UsageStats::from_counters(counters.clone()))
        .unwrap_or_default();
    let version_history = snapshot
        .get(StoreKey::VersionHistory)
        .and_then(|v| v.as_versions())
        .map(<[String]>::to_vec)
        .unwrap_or_default();
    let initial_install_time = snapshot
        .get(StoreKey::InstallTime)
        .and_then(|v| v.coerce_timestamp())
        .unwrap_or(0);
    let most_recent_update_time = snapshot
        .get(StoreKey::UpdateTime)
        .and_then(|v| v.coerce_timestamp())
        .unwrap_or(0);

    TelemetryRecord {
        usage_stats,
        version_history,
        initial_install_time,
        most_recent_update_time,
    }
}

#[cfg(test)]
mod tests {
    use reelsync_model::StoreValue;

    use super::*;

    #[test]
    fn missing_keys_resolve_to_defaults() {
        let prefs = resolve_preferences(&StoreSnapshot::new());
        assert_eq!(prefs, PreferenceSet::default());
    }

    #[test]
    fn one_bad_key_does_not_poison_the_rest() {
        let mut snapshot = StoreSnapshot::new();
        snapshot.insert(StoreKey::VolumeLevel, StoreValue::Text("loud".into()));
        snapshot.insert(StoreKey::PlaybackRate, 2.0.into());
        snapshot.insert(StoreKey::VolumeStep, 0.0.into());

        let prefs = resolve_preferences(&snapshot);
        assert_eq!(prefs.volume_level, Volume::FULL);
        assert_eq!(prefs.playback_rate.value(), 2.0);
        assert_eq!(prefs.volume_step, PreferenceSet::default().volume_step);
    }

    #[test]
    fn legacy_string_volume_coerces() {
        let mut snapshot = StoreSnapshot::new();
        snapshot.insert(StoreKey::VolumeLevel, StoreValue::Text("0.35".into()));
        let prefs = resolve_preferences(&snapshot);
        assert_eq!(prefs.volume_level.value(), 0.35);
    }

    #[test]
    fn out_of_range_rate_clamps_on_load() {
        let mut snapshot = StoreSnapshot::new();
        snapshot.insert(StoreKey::PlaybackRate, 1000.0.into());
        let prefs = resolve_preferences(&snapshot);
        assert_eq!(prefs.playback_rate.value(), PlaybackRate::MAX);
    }

    #[test]
    fn telemetry_resolves_counters_and_versions() {
        let mut stats = UsageStats::new();
        stats.increment("volume.applied");
        let mut snapshot = StoreSnapshot::new();
        snapshot.insert(StoreKey::UsageStats, stats.clone().into());
        snapshot.insert(
            StoreKey::VersionHistory,
            vec!["1.0.0".to_string(), "1.1.0".to_string()].into(),
        );
        snapshot.insert(StoreKey::InstallTime, 1_700_000_000_000_i64.into());

        let telemetry = resolve_telemetry(&snapshot);
        assert_eq!(telemetry.usage_stats.get("volume.applied"), 1);
        assert_eq!(telemetry.version_history.len(), 2);
        assert_eq!(telemetry.initial_install_time, 1_700_000_000_000);
        assert_eq!(telemetry.most_recent_update_time, 0);
    }
}
