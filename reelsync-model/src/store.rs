//! Records exchanged with the shared key-value store.
//!
//! The store is an eventually-consistent cross-tab relay: values may be
//! missing, may carry legacy encodings (numbers stored as strings), and may
//! arrive through change notifications in any order relative to the local
//! write that produced them. Everything here is defensive about shape.

use std::collections::HashMap;

use crate::preferences::StoreKey;
use crate::stats::UsageStats;

/// One persisted value. Mirrors the JSON shapes the record actually holds.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    Bool(bool),
    Number(f64),
    /// Legacy writers stored numbers as strings; kept so coercion has a
    /// faithful source representation.
    Text(String),
    Counters(HashMap<String, u64>),
    Versions(Vec<String>),
}

impl StoreValue {
    /// Numeric view with legacy-string coercion. `Text` parses as `f64`;
    /// anything unparseable or non-finite is `None` so the caller's default
    /// applies.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            StoreValue::Number(n) if n.is_finite() => Some(*n),
            StoreValue::Text(s) => {
                s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    /// Boolean view. Booleans were never string-encoded, so no coercion.
    pub fn coerce_bool(&self) -> Option<bool> {
        match self {
            StoreValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Millisecond-timestamp view (integers survive the `f64` wire shape).
    pub fn coerce_timestamp(&self) -> Option<i64> {
        self.coerce_number().map(|n| n as i64)
    }

    pub fn as_counters(&self) -> Option<&HashMap<String, u64>> {
        match self {
            StoreValue::Counters(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_versions(&self) -> Option<&[String]> {
        match self {
            StoreValue::Versions(list) => Some(list),
            _ => None,
        }
    }
}

impl From<bool> for StoreValue {
    fn from(value: bool) -> Self {
        StoreValue::Bool(value)
    }
}

impl From<f64> for StoreValue {
    fn from(value: f64) -> Self {
        StoreValue::Number(value)
    }
}

impl From<&str> for StoreValue {
    fn from(value: &str) -> Self {
        StoreValue::Text(value.to_string())
    }
}

impl From<UsageStats> for StoreValue {
    fn from(stats: UsageStats) -> Self {
        StoreValue::Counters(stats.into_inner())
    }
}

impl From<Vec<String>> for StoreValue {
    fn from(versions: Vec<String>) -> Self {
        StoreValue::Versions(versions)
    }
}

impl From<i64> for StoreValue {
    fn from(timestamp: i64) -> Self {
        StoreValue::Number(timestamp as f64)
    }
}

/// Full view of the record at one point in time.
///
/// Keys are wire strings because the record is shared: other extension
/// surfaces write keys this engine does not know about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    entries: HashMap<String, StoreValue>,
}

impl StoreSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: StoreKey) -> Option<&StoreValue> {
        self.entries.get(key.as_str())
    }

    pub fn get_raw(&self, key: &str) -> Option<&StoreValue> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: StoreKey, value: StoreValue) {
        self.entries.insert(key.as_str().to_string(), value);
    }

    pub fn insert_raw(&mut self, key: String, value: StoreValue) {
        self.entries.insert(key, value);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoreValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A batch of writes applied atomically to the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreDelta {
    entries: Vec<(StoreKey, StoreValue)>,
}

impl StoreDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: StoreKey, value: impl Into<StoreValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: StoreKey, value: impl Into<StoreValue>) {
        self.entries.push((key, value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StoreKey, &StoreValue)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

/// One key's transition inside a change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyChange {
    pub key: String,
    pub old: Option<StoreValue>,
    pub new: Option<StoreValue>,
}

impl KeyChange {
    /// Typed key when the change concerns a key this engine owns.
    pub fn store_key(&self) -> Option<StoreKey> {
        StoreKey::from_wire(&self.key)
    }
}

/// Change notification delivered to every context observing the record,
/// including the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub changes: Vec<KeyChange>,
    /// Record state after the write, so consumers never read back stale.
    pub snapshot: StoreSnapshot,
}

impl StoreChange {
    pub fn touches(&self, key: StoreKey) -> bool {
        self.changes.iter().any(|c| c.key == key.as_str())
    }

    pub fn change_for(&self, key: StoreKey) -> Option<&KeyChange> {
        self.changes.iter().find(|c| c.key == key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_string_numbers_coerce() {
        assert_eq!(StoreValue::Text("0.5".into()).coerce_number(), Some(0.5));
        assert_eq!(StoreValue::Text(" 2 ".into()).coerce_number(), Some(2.0));
        assert_eq!(StoreValue::Text("fast".into()).coerce_number(), None);
        assert_eq!(StoreValue::Text("NaN".into()).coerce_number(), None);
    }

    #[test]
    fn non_finite_numbers_do_not_coerce() {
        assert_eq!(StoreValue::Number(f64::NAN).coerce_number(), None);
        assert_eq!(StoreValue::Number(f64::INFINITY).coerce_number(), None);
    }

    #[test]
    fn bools_are_strict() {
        assert_eq!(StoreValue::Text("true".into()).coerce_bool(), None);
        assert_eq!(StoreValue::Bool(true).coerce_bool(), Some(true));
    }

    #[test]
    fn change_lookups_use_wire_names() {
        let change = StoreChange {
            changes: vec![KeyChange {
                key: "volumeLevel".into(),
                old: Some(StoreValue::Number(1.0)),
                new: Some(StoreValue::Number(0.4)),
            }],
            snapshot: StoreSnapshot::new(),
        };
        assert!(change.touches(StoreKey::VolumeLevel));
        assert!(!change.touches(StoreKey::PlaybackRate));
        let key_change = change.change_for(StoreKey::VolumeLevel).unwrap();
        assert_eq!(key_change.store_key(), Some(StoreKey::VolumeLevel));
    }
}
