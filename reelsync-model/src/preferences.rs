//! User preferences and the persistent record keys they live under.

use crate::values::{PlaybackRate, Volume};

/// Keys of the shared key-value record.
///
/// The wire names are the persisted contract; every reader supplies its own
/// defaults for keys that are missing or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StoreKey {
    /// Whether volume changes persist across navigations and tabs.
    RememberVolume,
    /// Whether playback-rate changes persist across navigations and tabs.
    RememberRate,
    /// Verbose diagnostics toggle.
    Debug,
    /// Last persisted volume, `[0, 1]`.
    VolumeLevel,
    /// Last persisted playback rate.
    PlaybackRate,
    /// Volume hotkey step size.
    VolumeStep,
    /// Playback-rate hotkey step size.
    RateStep,
    /// Named operation and error counters.
    UsageStats,
    /// Every version that has run under this profile, oldest first.
    VersionHistory,
    /// First-install wall-clock time, milliseconds since the epoch.
    InstallTime,
    /// Most recent version-change wall-clock time, milliseconds.
    UpdateTime,
}

impl StoreKey {
    /// Every key the engine reads or writes.
    pub const ALL: [StoreKey; 11] = [
        StoreKey::RememberVolume,
        StoreKey::RememberRate,
        StoreKey::Debug,
        StoreKey::VolumeLevel,
        StoreKey::PlaybackRate,
        StoreKey::VolumeStep,
        StoreKey::RateStep,
        StoreKey::UsageStats,
        StoreKey::VersionHistory,
        StoreKey::InstallTime,
        StoreKey::UpdateTime,
    ];

    /// The preference subset loaded at startup and mirrored by export/import.
    pub const PREFERENCES: [StoreKey; 7] = [
        StoreKey::RememberVolume,
        StoreKey::RememberRate,
        StoreKey::Debug,
        StoreKey::VolumeLevel,
        StoreKey::PlaybackRate,
        StoreKey::VolumeStep,
        StoreKey::RateStep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::RememberVolume => "rememberVolumeLevel",
            StoreKey::RememberRate => "rememberPlaybackRate",
            StoreKey::Debug => "debugMode",
            StoreKey::VolumeLevel => "volumeLevel",
            StoreKey::PlaybackRate => "playbackRate",
            StoreKey::VolumeStep => "volumeAdjustmentStepSize",
            StoreKey::RateStep => "playbackRateAdjustmentStepSize",
            StoreKey::UsageStats => "usageStats",
            StoreKey::VersionHistory => "appVersionHistory",
            StoreKey::InstallTime => "initialAppInstallTime",
            StoreKey::UpdateTime => "mostRecentUpdateTime",
        }
    }

    /// Reverse lookup for change notifications carrying wire names.
    pub fn from_wire(name: &str) -> Option<StoreKey> {
        StoreKey::ALL.iter().copied().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user-facing preference set, one logical instance per profile.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PreferenceSet {
    /// Persist volume changes.
    pub remember_volume: bool,
    /// Persist playback-rate changes.
    pub remember_rate: bool,
    /// Stored volume, applied to fresh videos when remembered.
    pub volume_level: Volume,
    /// Stored playback rate, applied to fresh videos when remembered.
    pub playback_rate: PlaybackRate,
    /// Volume hotkey step.
    pub volume_step: f64,
    /// Playback-rate hotkey step; also the snap grid for stepped rates.
    pub rate_step: f64,
    /// Verbose diagnostics.
    pub debug: bool,
}

impl Default for PreferenceSet {
    fn default() -> Self {
        Self {
            remember_volume: true,
            remember_rate: true,
            volume_level: Volume::FULL,
            playback_rate: PlaybackRate::NORMAL,
            volume_step: 0.1,
            rate_step: 0.125,
            debug: false,
        }
    }
}

impl PreferenceSet {
    /// Volume step with a sane floor; a stored zero or negative step would
    /// make the hotkeys inert.
    pub fn effective_volume_step(&self) -> f64 {
        if self.volume_step.is_finite() && self.volume_step > 0.0 {
            self.volume_step
        } else {
            Self::default().volume_step
        }
    }

    /// Rate step with the same floor as [`Self::effective_volume_step`].
    pub fn effective_rate_step(&self) -> f64 {
        if self.rate_step.is_finite() && self.rate_step > 0.0 {
            self.rate_step
        } else {
            Self::default().rate_step
        }
    }
}
