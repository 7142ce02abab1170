//! Port traits isolating the engine from browser surfaces.
//!
//! The engine never touches a DOM, an extension store, or a PiP platform
//! directly; embedders implement these traits and forward page activity as
//! [`crate::events::PageEvent`]s. Fakes for all of them live in
//! [`crate::testing`] behind the `test-utils` feature.

mod notice;
mod page;
mod pip;
mod store;
mod video;

#[cfg(any(test, feature = "test-utils"))]
pub use notice::MockNoticeSink;
pub use notice::NoticeSink;
#[cfg(any(test, feature = "test-utils"))]
pub use store::MockSettingsStore;
pub use page::{
    ControlCandidate, HostControl, PageSurface, RestorePoint, ScrollContainer,
    ScrollDirection,
};
pub use pip::{CompanionOptions, CompanionWindow, PipPlatform, WindowId};
pub use store::SettingsStore;
pub use video::VideoSurface;
