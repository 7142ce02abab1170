use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reelsync_model::VideoId;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::guard::FailureGuard;
use crate::ports::{
    CompanionOptions, CompanionWindow, NoticeSink, PageSurface, PipPlatform,
    RestorePoint,
};
use crate::registry::VideoRegistry;
use crate::telemetry::Telemetry;
use crate::tuning::EngineTuning;

const NOTICE_DURATION: Duration = Duration::from_secs(4);

/// Proof that a video was moved out of the page and must be put back.
///
/// Consumed exactly once by the restore; a token can be dropped only by
/// tearing the whole session down, never forgotten in passing.
#[must_use = "a relocated video stays orphaned until the token is restored"]
#[derive(Debug)]
pub struct RelocationToken {
    video: VideoId,
    point: RestorePoint,
}

impl RelocationToken {
    fn new(video: VideoId, point: RestorePoint) -> Self {
        Self { video, point }
    }

    pub fn video(&self) -> VideoId {
        self.video
    }

    fn into_parts(self) -> (VideoId, RestorePoint) {
        (self.video, self.point)
    }
}

enum Session {
    Idle,
    Companion {
        window: Arc<dyn CompanionWindow>,
        token: RelocationToken,
    },
}

/// Owns the floating companion window and the relocation of the active
/// video into it.
///
/// The companion replaces the platform's bare standard PiP frame: the real
/// video element moves into the window (a clone would split playback
/// state) and a visibility spoof keeps the host page from pausing the
/// "backgrounded" feed. The spoof is engaged only while a companion
/// session exists; every close path, graceful or not, disengages it.
#[derive(Clone)]
pub struct PipManager {
    page: Arc<dyn PageSurface>,
    platform: Arc<dyn PipPlatform>,
    registry: Arc<VideoRegistry>,
    notices: Arc<dyn NoticeSink>,
    guard: FailureGuard,
    telemetry: Arc<Telemetry>,
    tuning: Arc<EngineTuning>,
    session: Arc<Mutex<Session>>,
}

impl fmt::Debug for PipManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipManager")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl PipManager {
    pub fn new(
        page: Arc<dyn PageSurface>,
        platform: Arc<dyn PipPlatform>,
        registry: Arc<VideoRegistry>,
        notices: Arc<dyn NoticeSink>,
        guard: FailureGuard,
        telemetry: Arc<Telemetry>,
        tuning: EngineTuning,
    ) -> Self {
        Self {
            page,
            platform,
            registry,
            notices,
            guard,
            telemetry,
            tuning: Arc::new(tuning),
            session: Arc::new(Mutex::new(Session::Idle)),
        }
    }

    pub fn is_open(&self) -> bool {
        match &*self.session.lock() {
            Session::Companion { window, .. } => window.is_open(),
            Session::Idle => false,
        }
    }

    /// The video currently living in the companion window.
    pub fn companion_video(&self) -> Option<VideoId> {
        match &*self.session.lock() {
            Session::Companion { token, .. } => Some(token.video()),
            Session::Idle => None,
        }
    }

    /// Opens the companion for the active video, or closes it if one is
    /// open. Returns whether a companion is open afterwards.
    pub async fn toggle(&self) -> Result<bool> {
        if self.is_open() {
            self.close().await?;
            return Ok(false);
        }
        self.open(None).await?;
        Ok(true)
    }

    /// Replaces the platform's standard PiP frame with the companion.
    /// Standard PiP loses the feed's controls and navigation; the
    /// companion keeps them.
    pub async fn on_standard_pip_entered(&self, video: VideoId) {
        let _ = self
            .guard
            .run("pip.exitStandard", || self.platform.exit_standard_pip())
            .await;
        if !self.is_open() {
            let _ = self.open(Some(video)).await;
        }
    }

    /// Reacts to the user closing the companion window directly. The
    /// window is already gone; the video still has to come home and the
    /// visibility spoof has to drop.
    pub async fn on_companion_closed(&self) {
        let session = std::mem::replace(&mut *self.session.lock(), Session::Idle);
        if let Session::Companion { token, .. } = session {
            let _ = self.finish_close(None, token).await;
        }
    }

    /// Moves the companion over to the feed's new active video. Called
    /// after a navigation settles; a companion showing the previous reel
    /// is worse than none.
    pub async fn refresh_companion(&self) {
        let stale = {
            let session = self.session.lock();
            match &*session {
                Session::Companion { window, token }
                    if window.is_open() && !self.is_active(token.video()) =>
                {
                    true
                }
                _ => false,
            }
        };
        if !stale {
            return;
        }

        let session = std::mem::replace(&mut *self.session.lock(), Session::Idle);
        let Session::Companion { window, token } = session else {
            return;
        };
        let (old_video, point) = token.into_parts();
        let _ = self
            .guard
            .run("pip.restore", || self.page.restore_video(old_video, point))
            .await;

        match self.relocate_active_into(&window).await {
            Ok(token) => {
                debug!(video = %token.video(), "companion follows the feed");
                *self.session.lock() = Session::Companion { window, token };
            }
            Err(err) => {
                warn!("companion could not follow the feed: {err}");
                let _ = self.guard.run("pip.closeWindow", || window.close()).await;
                self.page.set_visibility_override(false);
                self.telemetry.count("pip.closed");
            }
        }
    }

    /// Closes the companion and restores the video. Safe to call with no
    /// session open.
    pub async fn close(&self) -> Result<()> {
        let session = std::mem::replace(&mut *self.session.lock(), Session::Idle);
        let Session::Companion { window, token } = session else {
            return Ok(());
        };
        self.finish_close(Some(window), token).await
    }

    async fn open(&self, target: Option<VideoId>) -> Result<()> {
        let target = match target {
            Some(id) => self.registry.get(id),
            None => self
                .registry
                .most_visible(self.page.viewport(), self.tuning.visible_min_height),
        };
        let Some(target) = target else {
            self.notices
                .show_notice("No video to pop out", NOTICE_DURATION);
            return Err(SyncError::NotFound("no visible video".into()));
        };

        if self.platform.standard_pip_video().is_some() {
            let _ = self
                .guard
                .run("pip.exitStandard", || self.platform.exit_standard_pip())
                .await;
        }

        let options = CompanionOptions {
            width: self.tuning.companion_width,
            height: self.tuning.companion_height,
        };
        let window = match self
            .guard
            .run("pip.open", || self.platform.open_companion(options))
            .await
        {
            Ok(window) => window,
            Err(err) => {
                self.notices
                    .show_notice("Couldn't open the floating player", NOTICE_DURATION);
                return Err(err);
            }
        };

        // Spoof visibility for the whole companion session so the host
        // never pauses the relocated video.
        self.page.set_visibility_override(true);
        let video = target.id();
        match self
            .guard
            .run("pip.relocate", || {
                self.page.move_video_into_window(video, window.id())
            })
            .await
        {
            Ok(point) => {
                debug!(%video, window = %window.id(), "companion opened");
                *self.session.lock() = Session::Companion {
                    window,
                    token: RelocationToken::new(video, point),
                };
                self.telemetry.count("pip.opened");
                Ok(())
            }
            Err(err) => {
                let _ = self.guard.run("pip.closeWindow", || window.close()).await;
                self.page.set_visibility_override(false);
                self.notices
                    .show_notice("Couldn't move the video out", NOTICE_DURATION);
                Err(err)
            }
        }
    }

    async fn finish_close(
        &self,
        window: Option<Arc<dyn CompanionWindow>>,
        token: RelocationToken,
    ) -> Result<()> {
        let (video, point) = token.into_parts();
        let restored = self
            .guard
            .run("pip.restore", || self.page.restore_video(video, point))
            .await;
        if let Some(window) = window {
            let _ = self.guard.run("pip.closeWindow", || window.close()).await;
        }
        self.page.set_visibility_override(false);
        self.telemetry.count("pip.closed");
        debug!(%video, "companion closed");
        restored
    }

    async fn relocate_active_into(
        &self,
        window: &Arc<dyn CompanionWindow>,
    ) -> Result<RelocationToken> {
        let active = self
            .registry
            .most_visible(self.page.viewport(), self.tuning.visible_min_height)
            .ok_or_else(|| SyncError::NotFound("no visible video".into()))?;
        let video = active.id();
        let point = self
            .guard
            .run("pip.relocate", || {
                self.page.move_video_into_window(video, window.id())
            })
            .await?;
        Ok(RelocationToken::new(video, point))
    }

    fn is_active(&self, video: VideoId) -> bool {
        self.registry
            .most_visible(self.page.viewport(), self.tuning.visible_min_height)
            .is_some_and(|active| active.id() == video)
    }
}
