//! # Reelsync Core
//!
//! Core library for the Reelsync feed companion, keeping playback settings
//! consistent across a reel-style video feed and every browser tab showing
//! one.
//!
//! ## Overview
//!
//! `reelsync-core` is host-agnostic: it never touches a DOM or an extension
//! API directly. The embedder implements a small set of ports and forwards
//! page activity; the library provides:
//!
//! - **Preference Store**: typed adapter over the embedder's key-value
//!   settings area, with change broadcasting and partial-write deltas
//! - **Value Reconciliation**: session/store/default fallback for volume and
//!   playback rate, debounced persistence, and echo-safe cross-tab apply
//! - **Video Registry**: adoption marking, liveness pruning, and
//!   most-visible selection for the active reel
//! - **Mute Sync**: host mute-control matching and bidirectional mute
//!   propagation, including scheduled forced unmutes
//! - **Session Features**: reel navigation, keyboard bindings, and a
//!   floating companion player replacing standard picture-in-picture
//! - **Settings Transfer**: whole-record JSON export and import
//!
//! ## Feature Flags
//!
//! - `test-utils`: in-memory fakes for every port, plus generated mocks
//!
//! ## Architecture
//!
//! One [`context::SyncContext`] per page wires everything together:
//!
//! - [`ports`]: the traits the embedder implements
//! - [`store`]: the typed preference adapter and an in-memory store
//! - [`engine`]: the value reconciliation engine
//! - [`registry`]: video adoption and lifecycle tracking
//! - [`mute`]: mute-state synchronization against the host UI
//! - [`session`]: navigation, keyboard, and companion-player features
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use reelsync_core::store::MemoryStore;
//! use reelsync_core::testing::{FakeNotices, FakePage, FakePip};
//! use reelsync_core::{PageEvent, SyncContext};
//!
//! async fn wire_up() -> reelsync_core::Result<()> {
//!     let page = FakePage::new();
//!     let context = SyncContext::builder(
//!         page.surface(),
//!         Arc::new(MemoryStore::new()),
//!         FakePip::new().platform(),
//!         FakeNotices::new().sink(),
//!     )
//!     .app_version("2.4.0")
//!     .build();
//!
//!     context.start().await?;
//!     context.handle_event(PageEvent::VideosMutated);
//!     context.shutdown().await;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Top-level composition root owning components and background tasks
pub mod context;

/// Value reconciliation engine for volume and playback rate
pub mod engine;

/// Error types shared across the crate
pub mod error;

/// Event and command types crossing the embedder boundary
pub mod events;

/// Failure guard running operations under log-and-count semantics
pub mod guard;

/// Mute-state synchronization against the host's own controls
pub mod mute;

/// Traits the embedder implements for page, store, PiP, and notices
pub mod ports;

/// Video adoption, lifecycle tracking, and visibility selection
pub mod registry;

/// Reel navigation, keyboard bindings, and the companion player
pub mod session;

/// Settings export and import
pub mod settings;

/// Typed preference store adapter and in-memory implementation
pub mod store;

/// Usage counters and version bookkeeping
pub mod telemetry;

/// In-memory fakes for every port
#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod testing;

/// Debouncers, throttles, retry schedules, and flood gates
pub mod timing;

/// Timing and threshold knobs, grouped
pub mod tuning;

pub use context::{SyncContext, SyncContextBuilder};
pub use error::{Result, SyncError};
pub use events::{Command, CommandAck, PageEvent};
pub use tuning::EngineTuning;

/// Everything an embedder needs in one import, model types included.
pub mod prelude {
    pub use reelsync_model::{
        Key, KeyInput, PlaybackRate, PreferenceSet, Rect, StoreDelta, StoreKey,
        StoreSnapshot, StoreValue, UsageStats, VideoId, Volume,
    };

    pub use crate::context::{SyncContext, SyncContextBuilder};
    pub use crate::error::{Result, SyncError};
    pub use crate::events::{Command, CommandAck, PageEvent};
    pub use crate::ports::{
        CompanionOptions, CompanionWindow, ControlCandidate, HostControl,
        NoticeSink, PageSurface, PipPlatform, RestorePoint, ScrollContainer,
        ScrollDirection, SettingsStore, VideoSurface, WindowId,
    };
    pub use crate::tuning::EngineTuning;
}
