use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reelsync_model::VideoId;

use crate::error::Result;

/// Embedder-minted identity of a companion window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(u64);

impl WindowId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// Requested geometry for a companion window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanionOptions {
    pub width: u32,
    pub height: u32,
}

/// An open always-on-top companion window hosting a relocated video.
#[async_trait]
pub trait CompanionWindow: Send + Sync {
    fn id(&self) -> WindowId;

    /// Whether the window is still open. Turns false when the user closes
    /// it directly.
    fn is_open(&self) -> bool;

    async fn close(&self) -> Result<()>;
}

/// Platform picture-in-picture facilities.
#[async_trait]
pub trait PipPlatform: Send + Sync {
    /// The video currently in the platform's standard PiP window, if any.
    fn standard_pip_video(&self) -> Option<VideoId>;

    /// Dismisses the platform's standard PiP window.
    async fn exit_standard_pip(&self) -> Result<()>;

    /// Opens a new companion window with the requested geometry.
    async fn open_companion(
        &self,
        options: CompanionOptions,
    ) -> Result<Arc<dyn CompanionWindow>>;
}
