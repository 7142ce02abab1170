//! Flat settings document for export and import.
//!
//! The document mirrors the persistent record's wire keys one-to-one so an
//! exported file is readable next to the store itself. Import is lenient per
//! key (missing or ill-typed values fall back to defaults) but strict about
//! the envelope: a file that does not parse as JSON is rejected wholesale.

use crate::preferences::PreferenceSet;
use crate::stats::{TelemetryRecord, UsageStats};
use crate::values::{PlaybackRate, Volume};

/// Everything the record persists, every field optional.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SettingsDocument {
    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "rememberVolumeLevel",
            deserialize_with = "lenient::bool_opt",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub remember_volume: Option<bool>,

    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "rememberPlaybackRate",
            deserialize_with = "lenient::bool_opt",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub remember_rate: Option<bool>,

    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "debugMode",
            deserialize_with = "lenient::bool_opt",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub debug: Option<bool>,

    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "volumeLevel",
            deserialize_with = "lenient::number_opt",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub volume_level: Option<f64>,

    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "playbackRate",
            deserialize_with = "lenient::number_opt",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub playback_rate: Option<f64>,

    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "volumeAdjustmentStepSize",
            deserialize_with = "lenient::number_opt",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub volume_step: Option<f64>,

    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "playbackRateAdjustmentStepSize",
            deserialize_with = "lenient::number_opt",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub rate_step: Option<f64>,

    #[cfg_attr(
        feature = "serde",
        serde(rename = "usageStats", skip_serializing_if = "Option::is_none")
    )]
    pub usage_stats: Option<std::collections::HashMap<String, u64>>,

    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "appVersionHistory",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub version_history: Option<Vec<String>>,

    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "initialAppInstallTime",
            deserialize_with = "lenient::timestamp_opt",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub initial_install_time: Option<i64>,

    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "mostRecentUpdateTime",
            deserialize_with = "lenient::timestamp_opt",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub most_recent_update_time: Option<i64>,
}

impl SettingsDocument {
    /// Snapshot of the current state, ready for export.
    pub fn from_state(
        prefs: &PreferenceSet,
        telemetry: &TelemetryRecord,
    ) -> Self {
        SettingsDocument {
            remember_volume: Some(prefs.remember_volume),
            remember_rate: Some(prefs.remember_rate),
            debug: Some(prefs.debug),
            volume_level: Some(prefs.volume_level.value()),
            playback_rate: Some(prefs.playback_rate.value()),
            volume_step: Some(prefs.volume_step),
            rate_step: Some(prefs.rate_step),
            usage_stats: Some(telemetry.usage_stats.clone().into_inner()),
            version_history: Some(telemetry.version_history.clone()),
            initial_install_time: Some(telemetry.initial_install_time),
            most_recent_update_time: Some(telemetry.most_recent_update_time),
        }
    }

    /// Preference set with per-key default substitution. Out-of-range values
    /// clamp; non-numeric and missing values take the default.
    pub fn resolve_preferences(&self) -> PreferenceSet {
        let defaults = PreferenceSet::default();
        PreferenceSet {
            remember_volume: self
                .remember_volume
                .unwrap_or(defaults.remember_volume),
            remember_rate: self.remember_rate.unwrap_or(defaults.remember_rate),
            debug: self.debug.unwrap_or(defaults.debug),
            volume_level: self
                .volume_level
                .and_then(Volume::try_new)
                .unwrap_or(defaults.volume_level),
            playback_rate: self
                .playback_rate
                .and_then(PlaybackRate::try_new)
                .unwrap_or(defaults.playback_rate),
            volume_step: self
                .volume_step
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(defaults.volume_step),
            rate_step: self
                .rate_step
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(defaults.rate_step),
        }
    }

    /// Telemetry carried by the document, if any field is present. Missing
    /// fields inside the record default rather than erase: imports restore
    /// settings, they do not reset install bookkeeping.
    pub fn resolve_telemetry(&self) -> Option<TelemetryRecord> {
        if self.usage_stats.is_none()
            && self.version_history.is_none()
            && self.initial_install_time.is_none()
            && self.most_recent_update_time.is_none()
        {
            return None;
        }
        Some(TelemetryRecord {
            usage_stats: self
                .usage_stats
                .clone()
                .map(UsageStats::from_counters)
                .unwrap_or_default(),
            version_history: self.version_history.clone().unwrap_or_default(),
            initial_install_time: self.initial_install_time.unwrap_or(0),
            most_recent_update_time: self
                .most_recent_update_time
                .unwrap_or(0),
        })
    }
}

#[cfg(feature = "serde")]
mod lenient {
    //! Field deserializers that degrade ill-typed values to `None` instead
    //! of failing the whole document. Exports from older versions carried
    //! numbers as strings.

    use serde::{Deserialize, Deserializer};

    pub fn number_opt<'de, D>(de: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(de)?;
        Ok(value.and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
            serde_json::Value::String(s) => {
                s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
            }
            _ => None,
        }))
    }

    pub fn bool_opt<'de, D>(de: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(de)?;
        Ok(value.and_then(|v| v.as_bool()))
    }

    pub fn timestamp_opt<'de, D>(de: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(de)?;
        Ok(value.and_then(|v| v.as_i64()))
    }
}
