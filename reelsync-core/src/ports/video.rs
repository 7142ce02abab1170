use reelsync_model::{Rect, VideoId};

use crate::error::Result;

/// A single playable video element on the page.
///
/// Reads are infallible snapshots of the element's current properties.
/// Writes can fail when the host page rejects or races the mutation, and
/// callers decide per call site whether that failure is worth surfacing.
///
/// The surface stays valid after the underlying element detaches;
/// `is_connected` turns false and the registry prunes the handle on the
/// next access.
pub trait VideoSurface: Send + Sync {
    /// Stable identity minted by the embedder when the element was first
    /// wrapped. Identifies the handle, not the DOM node position.
    fn id(&self) -> VideoId;

    /// Whether the element is still attached to the document.
    fn is_connected(&self) -> bool;

    /// Current layout box in viewport coordinates, if the element is
    /// rendered.
    fn bounding_box(&self) -> Option<Rect>;

    fn volume(&self) -> f64;

    fn set_volume(&self, volume: f64) -> Result<()>;

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&self, rate: f64) -> Result<()>;

    fn muted(&self) -> bool;

    fn set_muted(&self, muted: bool) -> Result<()>;

    fn paused(&self) -> bool;

    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    /// Whether a named marker attribute is present on the element.
    fn has_marker(&self, name: &str) -> bool;

    /// Sets a named marker attribute on the element.
    fn set_marker(&self, name: &str);

    /// Toggles the element's native playback controls.
    fn set_native_controls(&self, enabled: bool);
}
