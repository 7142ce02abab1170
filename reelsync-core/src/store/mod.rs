//! Typed access to the shared settings record.
//!
//! [`PreferenceStore`] turns raw snapshots into [`reelsync_model::PreferenceSet`]
//! values with per-key default substitution, so a corrupt or missing key never
//! poisons the rest of the record. [`MemoryStore`] is an in-process
//! implementation of the store port with the same change-echo semantics as the
//! extension-backed store.

mod adapter;
mod memory;

pub use adapter::{PreferenceStore, StoreState, resolve_preferences, resolve_telemetry};
pub use memory::MemoryStore;
