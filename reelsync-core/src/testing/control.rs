use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, SyncError};
use crate::ports::HostControl;
use crate::testing::FakeVideo;

type Action = Box<dyn Fn() + Send + Sync>;

/// In-memory host control. Counts activations and optionally runs a
/// side effect, the way a real host button flips page state.
#[derive(Clone)]
pub struct FakeControl {
    inner: Arc<Inner>,
}

struct Inner {
    activations: AtomicUsize,
    failing: AtomicBool,
    action: Mutex<Option<Action>>,
}

impl FakeControl {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                activations: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                action: Mutex::new(None),
            }),
        }
    }

    /// A control whose activation toggles the given video's muted flag,
    /// mirroring the host's own mute button handler.
    pub fn toggling_mute_of(video: &FakeVideo) -> Self {
        let video = video.clone();
        Self::new().with_action(move || video.set_muted_raw(!video.is_muted()))
    }

    pub fn with_action(self, action: impl Fn() + Send + Sync + 'static) -> Self {
        *self.inner.action.lock() = Some(Box::new(action));
        self
    }

    /// Makes every activation fail, like a detached button.
    pub fn failing(self) -> Self {
        self.inner.failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn activations(&self) -> usize {
        self.inner.activations.load(Ordering::SeqCst)
    }

    pub fn as_host_control(&self) -> Arc<dyn HostControl> {
        Arc::new(self.clone())
    }
}

impl Default for FakeControl {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FakeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeControl")
            .field("activations", &self.activations())
            .finish_non_exhaustive()
    }
}

impl HostControl for FakeControl {
    fn activate(&self) -> Result<()> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Platform("control rejected activation".into()));
        }
        self.inner.activations.fetch_add(1, Ordering::SeqCst);
        if let Some(action) = self.inner.action.lock().as_ref() {
            action();
        }
        Ok(())
    }
}
