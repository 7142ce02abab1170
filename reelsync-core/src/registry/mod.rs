//! Live-video bookkeeping.
//!
//! The registry owns one handle per feed video currently on the page. The
//! host application recycles video elements aggressively, so nothing here
//! assumes a handle outlives the next feed mutation; every accessor prunes
//! handles whose element has detached.

mod scanner;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use reelsync_model::{Rect, VideoId};
use tokio::sync::broadcast;
use tracing::debug;

use crate::ports::VideoSurface;

pub use scanner::VideoScanner;

/// Marker attribute stamped on adopted elements so a second pass over the
/// same element never re-initializes it.
pub const MARKER_INITIALIZED: &str = "data-reelsync-initialized";

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// One tracked feed video.
pub struct VideoHandle {
    id: VideoId,
    surface: Arc<dyn VideoSurface>,
    /// Muted state this engine last set or observed on the element. Lets
    /// pollers tell their own writes apart from host or user activity.
    last_observed_muted: AtomicBool,
}

impl VideoHandle {
    fn new(surface: Arc<dyn VideoSurface>) -> Self {
        let last_observed_muted = AtomicBool::new(surface.muted());
        Self {
            id: surface.id(),
            surface,
            last_observed_muted,
        }
    }

    pub fn id(&self) -> VideoId {
        self.id
    }

    pub fn surface(&self) -> &Arc<dyn VideoSurface> {
        &self.surface
    }

    pub fn is_connected(&self) -> bool {
        self.surface.is_connected()
    }

    pub fn last_observed_muted(&self) -> bool {
        self.last_observed_muted.load(Ordering::Relaxed)
    }

    pub fn note_muted(&self, muted: bool) {
        self.last_observed_muted.store(muted, Ordering::Relaxed);
    }
}

impl fmt::Debug for VideoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoHandle")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .field("last_observed_muted", &self.last_observed_muted())
            .finish_non_exhaustive()
    }
}

/// Registry change notifications.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A video was adopted for the first time.
    Registered(Arc<VideoHandle>),
    /// A tracked video's element detached and the handle was pruned.
    Removed(VideoId),
}

/// Identity map over the feed's video elements.
pub struct VideoRegistry {
    videos: DashMap<VideoId, Arc<VideoHandle>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl fmt::Debug for VideoRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoRegistry")
            .field("len", &self.videos.len())
            .finish_non_exhaustive()
    }
}

impl Default for VideoRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            videos: DashMap::new(),
            events,
        }
    }

    /// Adopts a discovered video. Returns the handle and whether this call
    /// adopted it; an element already carrying the marker is returned
    /// without re-initialization even when this registry instance has never
    /// seen it, which keeps re-entry after a page restore idempotent.
    pub fn adopt(&self, surface: Arc<dyn VideoSurface>) -> (Arc<VideoHandle>, bool) {
        let id = surface.id();
        if let Some(existing) = self.videos.get(&id) {
            return (Arc::clone(existing.value()), false);
        }

        let previously_marked = surface.has_marker(MARKER_INITIALIZED);
        if !previously_marked {
            surface.set_marker(MARKER_INITIALIZED);
        }
        let handle = Arc::new(VideoHandle::new(surface));
        self.videos.insert(id, Arc::clone(&handle));

        let adopted = !previously_marked;
        if adopted {
            debug!(video = %id, "adopted video");
            let _ = self.events.send(RegistryEvent::Registered(Arc::clone(&handle)));
        }
        (handle, adopted)
    }

    /// Looks up a handle, pruning it if its element has detached.
    pub fn get(&self, id: VideoId) -> Option<Arc<VideoHandle>> {
        let handle = self.videos.get(&id).map(|entry| Arc::clone(entry.value()))?;
        if handle.is_connected() {
            Some(handle)
        } else {
            self.remove(id);
            None
        }
    }

    /// Every currently connected handle, pruning detached ones on the way.
    pub fn connected(&self) -> Vec<Arc<VideoHandle>> {
        let mut alive = Vec::new();
        let mut dead = Vec::new();
        for entry in self.videos.iter() {
            let handle = Arc::clone(entry.value());
            if handle.is_connected() {
                alive.push(handle);
            } else {
                dead.push(handle.id());
            }
        }
        for id in dead {
            self.remove(id);
        }
        alive
    }

    /// Drops every handle whose element has detached.
    pub fn prune(&self) -> usize {
        let before = self.videos.len();
        let _ = self.connected();
        before - self.videos.len()
    }

    /// The connected video whose center sits closest to the viewport
    /// center. Videos without a rendered height above `min_height` do not
    /// qualify; collapsed placeholders in the feed report tiny boxes.
    pub fn most_visible(
        &self,
        viewport: Rect,
        min_height: f64,
    ) -> Option<Arc<VideoHandle>> {
        self.connected()
            .into_iter()
            .filter_map(|handle| {
                let bounds = handle.surface().bounding_box()?;
                if !bounds.has_rendered_height(min_height) {
                    return None;
                }
                Some((handle, bounds.center_distance_to(&viewport)))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(handle, _)| handle)
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    fn remove(&self, id: VideoId) {
        if self.videos.remove(&id).is_some() {
            debug!(video = %id, "pruned detached video");
            let _ = self.events.send(RegistryEvent::Removed(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeVideo;

    #[test]
    fn adoption_is_idempotent_per_element() {
        let registry = VideoRegistry::new();
        let video = FakeVideo::new();

        let (first, adopted) = registry.adopt(video.surface());
        assert!(adopted);
        let (second, adopted_again) = registry.adopt(video.surface());
        assert!(!adopted_again);
        assert_eq!(first.id(), second.id());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn marked_element_is_tracked_but_not_readopted() {
        let registry = VideoRegistry::new();
        let video = FakeVideo::new();
        video.surface().set_marker(MARKER_INITIALIZED);

        let (_, adopted) = registry.adopt(video.surface());
        assert!(!adopted);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn detached_videos_prune_on_access() {
        let registry = VideoRegistry::new();
        let video = FakeVideo::new();
        let (handle, _) = registry.adopt(video.surface());

        video.detach();
        assert!(registry.get(handle.id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn most_visible_prefers_center_distance_over_order() {
        let registry = VideoRegistry::new();
        let viewport = Rect::new(0.0, 0.0, 400.0, 800.0);

        let offscreen = FakeVideo::new().with_bounds(Rect::new(0.0, -800.0, 400.0, 700.0));
        let centered = FakeVideo::new().with_bounds(Rect::new(0.0, 50.0, 400.0, 700.0));
        let below = FakeVideo::new().with_bounds(Rect::new(0.0, 900.0, 400.0, 700.0));
        registry.adopt(offscreen.surface());
        registry.adopt(centered.surface());
        registry.adopt(below.surface());

        let best = registry.most_visible(viewport, 100.0).expect("candidate");
        assert_eq!(best.id(), centered.surface().id());
    }

    #[test]
    fn collapsed_placeholders_never_win_visibility() {
        let registry = VideoRegistry::new();
        let viewport = Rect::new(0.0, 0.0, 400.0, 800.0);

        let placeholder =
            FakeVideo::new().with_bounds(Rect::new(0.0, 390.0, 400.0, 20.0));
        registry.adopt(placeholder.surface());

        assert!(registry.most_visible(viewport, 100.0).is_none());
    }
}
