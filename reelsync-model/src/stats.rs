//! Aggregate usage and error counters.

use std::collections::HashMap;

/// Named monotonic counters persisted under one record key.
///
/// The failure guard writes `<short_key>.<operation>` entries; feature code
/// bumps plain operation names. The uninstall-survey surface reads these,
/// nothing in the engine ever does.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UsageStats {
    counters: HashMap<String, u64>,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counters(counters: HashMap<String, u64>) -> Self {
        UsageStats { counters }
    }

    pub fn increment(&mut self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&mut self, name: &str, count: u64) {
        *self.counters.entry(name.to_string()).or_insert(0) += count;
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counters.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn into_inner(self) -> HashMap<String, u64> {
        self.counters
    }
}

/// Install and version bookkeeping persisted alongside the counters.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryRecord {
    pub usage_stats: UsageStats,
    /// Every version that has run under this profile, oldest first.
    pub version_history: Vec<String>,
    /// First-install time, milliseconds since the epoch. Zero when unset.
    pub initial_install_time: i64,
    /// Most recent version-change time, milliseconds. Zero when unset.
    pub most_recent_update_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut stats = UsageStats::new();
        stats.increment("applySettings");
        stats.increment("applySettings");
        stats.increment("muteSync.locate");
        assert_eq!(stats.get("applySettings"), 2);
        assert_eq!(stats.get("muteSync.locate"), 1);
        assert_eq!(stats.get("never"), 0);
    }
}
