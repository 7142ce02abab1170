//! Core data model definitions shared across reelsync crates.
#![allow(missing_docs)]

pub mod document;
pub mod geometry;
pub mod ids;
pub mod input;
pub mod preferences;
pub mod stats;
pub mod store;
pub mod values;

// Intentionally curated re-exports for downstream consumers.
pub use document::SettingsDocument;
pub use geometry::Rect;
pub use ids::VideoId;
pub use input::{Key, KeyInput};
pub use preferences::{PreferenceSet, StoreKey};
pub use stats::{TelemetryRecord, UsageStats};
pub use store::{KeyChange, StoreChange, StoreDelta, StoreSnapshot, StoreValue};
pub use values::{MIN_SIGNIFICANT_DELTA, PlaybackRate, Volume};
