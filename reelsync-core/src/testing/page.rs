use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use reelsync_model::{Rect, VideoId};

use crate::error::{Result, SyncError};
use crate::ports::{
    ControlCandidate, PageSurface, RestorePoint, ScrollContainer, ScrollDirection,
    VideoSurface, WindowId,
};
use crate::testing::FakeVideo;

/// In-memory page. Videos, candidates, and scroll containers are plain
/// collections the test mutates directly.
#[derive(Clone)]
pub struct FakePage {
    inner: Arc<Inner>,
}

struct Inner {
    videos: Mutex<Vec<FakeVideo>>,
    viewport: Mutex<Rect>,
    candidates: Mutex<HashMap<VideoId, Vec<ControlCandidate>>>,
    containers: Mutex<Vec<ScrollContainer>>,
    scrolls: Mutex<Vec<(Option<u64>, ScrollDirection)>>,
    visibility_override: AtomicBool,
    overlay_released: Mutex<Vec<VideoId>>,
    next_restore_point: AtomicU64,
    relocated: Mutex<HashMap<VideoId, (WindowId, u64)>>,
    restored: Mutex<Vec<(VideoId, u64)>>,
    fail_relocation: AtomicBool,
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                videos: Mutex::new(Vec::new()),
                viewport: Mutex::new(Rect::new(0.0, 0.0, 400.0, 800.0)),
                candidates: Mutex::new(HashMap::new()),
                containers: Mutex::new(Vec::new()),
                scrolls: Mutex::new(Vec::new()),
                visibility_override: AtomicBool::new(false),
                overlay_released: Mutex::new(Vec::new()),
                next_restore_point: AtomicU64::new(1),
                relocated: Mutex::new(HashMap::new()),
                restored: Mutex::new(Vec::new()),
                fail_relocation: AtomicBool::new(false),
            }),
        }
    }

    pub fn surface(&self) -> Arc<dyn PageSurface> {
        Arc::new(self.clone())
    }

    pub fn add_video(&self, video: &FakeVideo) {
        self.inner.videos.lock().push(video.clone());
    }

    pub fn remove_video(&self, video: &FakeVideo) {
        let id = video.surface().id();
        self.inner.videos.lock().retain(|v| v.surface().id() != id);
    }

    pub fn set_viewport(&self, viewport: Rect) {
        *self.inner.viewport.lock() = viewport;
    }

    pub fn set_candidates(&self, video: VideoId, candidates: Vec<ControlCandidate>) {
        self.inner.candidates.lock().insert(video, candidates);
    }

    pub fn set_containers(&self, containers: Vec<ScrollContainer>) {
        *self.inner.containers.lock() = containers;
    }

    pub fn scrolls(&self) -> Vec<(Option<u64>, ScrollDirection)> {
        self.inner.scrolls.lock().clone()
    }

    pub fn visibility_overridden(&self) -> bool {
        self.inner.visibility_override.load(Ordering::SeqCst)
    }

    pub fn overlay_released_for(&self, video: VideoId) -> bool {
        self.inner.overlay_released.lock().contains(&video)
    }

    /// Which window currently hosts the video, if it was moved out.
    pub fn relocated_to(&self, video: VideoId) -> Option<WindowId> {
        self.inner
            .relocated
            .lock()
            .get(&video)
            .map(|(window, _)| *window)
    }

    pub fn restore_count(&self, video: VideoId) -> usize {
        self.inner
            .restored
            .lock()
            .iter()
            .filter(|(id, _)| *id == video)
            .count()
    }

    /// Makes the next relocation attempt fail.
    pub fn fail_next_relocation(&self) {
        self.inner.fail_relocation.store(true, Ordering::SeqCst);
    }
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FakePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakePage")
            .field("videos", &self.inner.videos.lock().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PageSurface for FakePage {
    fn discover_videos(&self) -> Vec<Arc<dyn VideoSurface>> {
        self.inner
            .videos
            .lock()
            .iter()
            .map(FakeVideo::surface)
            .collect()
    }

    fn viewport(&self) -> Rect {
        *self.inner.viewport.lock()
    }

    fn mute_control_candidates(&self, video: VideoId) -> Vec<ControlCandidate> {
        self.inner
            .candidates
            .lock()
            .get(&video)
            .cloned()
            .unwrap_or_default()
    }

    fn scroll_containers(&self) -> Vec<ScrollContainer> {
        self.inner.containers.lock().clone()
    }

    async fn scroll_container(
        &self,
        container: Option<u64>,
        direction: ScrollDirection,
    ) -> Result<()> {
        self.inner.scrolls.lock().push((container, direction));
        Ok(())
    }

    fn set_visibility_override(&self, engaged: bool) {
        self.inner.visibility_override.store(engaged, Ordering::SeqCst);
    }

    fn release_overlay_capture(&self, video: VideoId) {
        self.inner.overlay_released.lock().push(video);
    }

    async fn move_video_into_window(
        &self,
        video: VideoId,
        window: WindowId,
    ) -> Result<RestorePoint> {
        if self.inner.fail_relocation.swap(false, Ordering::SeqCst) {
            return Err(SyncError::Platform("relocation refused".into()));
        }
        let raw = self.inner.next_restore_point.fetch_add(1, Ordering::SeqCst);
        self.inner.relocated.lock().insert(video, (window, raw));
        Ok(RestorePoint::new(raw))
    }

    async fn restore_video(&self, video: VideoId, point: RestorePoint) -> Result<()> {
        self.inner.relocated.lock().remove(&video);
        self.inner.restored.lock().push((video, point.raw()));
        Ok(())
    }
}
