use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use reelsync_model::VideoId;

use crate::error::{Result, SyncError};
use crate::ports::{CompanionOptions, CompanionWindow, PipPlatform, WindowId};

/// In-memory companion window.
#[derive(Clone)]
pub struct FakeCompanionWindow {
    inner: Arc<WindowInner>,
}

struct WindowInner {
    id: WindowId,
    open: AtomicBool,
    close_calls: AtomicUsize,
}

impl FakeCompanionWindow {
    fn new(id: WindowId) -> Self {
        Self {
            inner: Arc::new(WindowInner {
                id,
                open: AtomicBool::new(true),
                close_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Simulates the user closing the window directly, without the
    /// engine's close path running.
    pub fn user_closes(&self) {
        self.inner.open.store(false, Ordering::SeqCst);
    }

    pub fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for FakeCompanionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeCompanionWindow")
            .field("id", &self.inner.id)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CompanionWindow for FakeCompanionWindow {
    fn id(&self) -> WindowId {
        self.inner.id
    }

    fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory PiP platform.
#[derive(Clone)]
pub struct FakePip {
    inner: Arc<PipInner>,
}

struct PipInner {
    standard: Mutex<Option<VideoId>>,
    windows: Mutex<Vec<FakeCompanionWindow>>,
    last_options: Mutex<Option<CompanionOptions>>,
    next_window: AtomicU64,
    exit_calls: AtomicUsize,
    fail_open: AtomicBool,
}

impl FakePip {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PipInner {
                standard: Mutex::new(None),
                windows: Mutex::new(Vec::new()),
                last_options: Mutex::new(None),
                next_window: AtomicU64::new(1),
                exit_calls: AtomicUsize::new(0),
                fail_open: AtomicBool::new(false),
            }),
        }
    }

    pub fn platform(&self) -> Arc<dyn PipPlatform> {
        Arc::new(self.clone())
    }

    pub fn set_standard_pip(&self, video: Option<VideoId>) {
        *self.inner.standard.lock() = video;
    }

    /// Makes the next companion open fail, like a popup blocker.
    pub fn fail_next_open(&self) {
        self.inner.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn windows(&self) -> Vec<FakeCompanionWindow> {
        self.inner.windows.lock().clone()
    }

    pub fn last_window(&self) -> Option<FakeCompanionWindow> {
        self.inner.windows.lock().last().cloned()
    }

    pub fn last_options(&self) -> Option<CompanionOptions> {
        *self.inner.last_options.lock()
    }

    pub fn exit_calls(&self) -> usize {
        self.inner.exit_calls.load(Ordering::SeqCst)
    }
}

impl Default for FakePip {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FakePip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakePip")
            .field("windows", &self.inner.windows.lock().len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PipPlatform for FakePip {
    fn standard_pip_video(&self) -> Option<VideoId> {
        *self.inner.standard.lock()
    }

    async fn exit_standard_pip(&self) -> Result<()> {
        self.inner.exit_calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.standard.lock() = None;
        Ok(())
    }

    async fn open_companion(
        &self,
        options: CompanionOptions,
    ) -> Result<Arc<dyn CompanionWindow>> {
        if self.inner.fail_open.swap(false, Ordering::SeqCst) {
            return Err(SyncError::Platform("companion window blocked".into()));
        }
        *self.inner.last_options.lock() = Some(options);
        let id = WindowId::new(self.inner.next_window.fetch_add(1, Ordering::SeqCst));
        let window = FakeCompanionWindow::new(id);
        self.inner.windows.lock().push(window.clone());
        Ok(Arc::new(window))
    }
}
