use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use reelsync_model::{Rect, VideoId};

use crate::error::Result;
use crate::ports::VideoSurface;

/// In-memory video element. Clones share state, so a test can hold the
/// fake for inspection while the engine holds its surface.
#[derive(Clone)]
pub struct FakeVideo {
    inner: Arc<Inner>,
}

struct Inner {
    id: VideoId,
    connected: AtomicBool,
    volume: Mutex<f64>,
    rate: Mutex<f64>,
    muted: AtomicBool,
    paused: AtomicBool,
    native_controls: AtomicBool,
    markers: Mutex<HashSet<String>>,
    bounds: Mutex<Option<Rect>>,
    /// How many upcoming unmute writes the fake host swallows.
    swallow_unmutes: AtomicUsize,
    volume_writes: AtomicUsize,
    rate_writes: AtomicUsize,
}

impl FakeVideo {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: VideoId::new(),
                connected: AtomicBool::new(true),
                volume: Mutex::new(1.0),
                rate: Mutex::new(1.0),
                muted: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                native_controls: AtomicBool::new(false),
                markers: Mutex::new(HashSet::new()),
                bounds: Mutex::new(Some(Rect::new(0.0, 0.0, 360.0, 640.0))),
                swallow_unmutes: AtomicUsize::new(0),
                volume_writes: AtomicUsize::new(0),
                rate_writes: AtomicUsize::new(0),
            }),
        }
    }

    pub fn with_volume(self, volume: f64) -> Self {
        *self.inner.volume.lock() = volume;
        self
    }

    pub fn with_rate(self, rate: f64) -> Self {
        *self.inner.rate.lock() = rate;
        self
    }

    pub fn start_muted(self) -> Self {
        self.inner.muted.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_bounds(self, bounds: Rect) -> Self {
        *self.inner.bounds.lock() = Some(bounds);
        self
    }

    /// Makes the fake behave like a host that re-asserts mute: the next
    /// `count` unmute writes report success but change nothing.
    pub fn swallow_unmutes(self, count: usize) -> Self {
        self.inner.swallow_unmutes.store(count, Ordering::SeqCst);
        self
    }

    pub fn surface(&self) -> Arc<dyn VideoSurface> {
        Arc::new(self.clone())
    }

    /// Simulates the element leaving the document.
    pub fn detach(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
    }

    /// State change that bypasses the surface, the way host scripts and
    /// direct user interaction reach the element.
    pub fn set_muted_raw(&self, muted: bool) {
        self.inner.muted.store(muted, Ordering::SeqCst);
    }

    pub fn set_volume_raw(&self, volume: f64) {
        *self.inner.volume.lock() = volume;
    }

    pub fn set_bounds(&self, bounds: Option<Rect>) {
        *self.inner.bounds.lock() = bounds;
    }

    pub fn volume(&self) -> f64 {
        *self.inner.volume.lock()
    }

    pub fn playback_rate(&self) -> f64 {
        *self.inner.rate.lock()
    }

    pub fn is_muted(&self) -> bool {
        self.inner.muted.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    pub fn native_controls_enabled(&self) -> bool {
        self.inner.native_controls.load(Ordering::SeqCst)
    }

    pub fn volume_writes(&self) -> usize {
        self.inner.volume_writes.load(Ordering::SeqCst)
    }

    pub fn rate_writes(&self) -> usize {
        self.inner.rate_writes.load(Ordering::SeqCst)
    }
}

impl Default for FakeVideo {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FakeVideo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeVideo")
            .field("id", &self.inner.id)
            .field("volume", &self.volume())
            .field("muted", &self.is_muted())
            .finish_non_exhaustive()
    }
}

impl VideoSurface for FakeVideo {
    fn id(&self) -> VideoId {
        self.inner.id
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    fn bounding_box(&self) -> Option<Rect> {
        *self.inner.bounds.lock()
    }

    fn volume(&self) -> f64 {
        *self.inner.volume.lock()
    }

    fn set_volume(&self, volume: f64) -> Result<()> {
        self.inner.volume_writes.fetch_add(1, Ordering::SeqCst);
        *self.inner.volume.lock() = volume;
        Ok(())
    }

    fn playback_rate(&self) -> f64 {
        *self.inner.rate.lock()
    }

    fn set_playback_rate(&self, rate: f64) -> Result<()> {
        self.inner.rate_writes.fetch_add(1, Ordering::SeqCst);
        *self.inner.rate.lock() = rate;
        Ok(())
    }

    fn muted(&self) -> bool {
        self.inner.muted.load(Ordering::SeqCst)
    }

    fn set_muted(&self, muted: bool) -> Result<()> {
        if !muted {
            let remaining = self.inner.swallow_unmutes.load(Ordering::SeqCst);
            if remaining > 0 {
                if remaining != usize::MAX {
                    self.inner
                        .swallow_unmutes
                        .store(remaining - 1, Ordering::SeqCst);
                }
                return Ok(());
            }
        }
        self.inner.muted.store(muted, Ordering::SeqCst);
        Ok(())
    }

    fn paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    fn play(&self) -> Result<()> {
        self.inner.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        self.inner.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn has_marker(&self, name: &str) -> bool {
        self.inner.markers.lock().contains(name)
    }

    fn set_marker(&self, name: &str) {
        self.inner.markers.lock().insert(name.to_string());
    }

    fn set_native_controls(&self, enabled: bool) {
        self.inner.native_controls.store(enabled, Ordering::SeqCst);
    }
}
