//! Bidirectional mute reconciliation.
//!
//! Mute is global to the feed: flipping one video flips them all. The sync
//! prefers activating the host's own mute control, which keeps the host UI
//! truthful, and falls back to writing the element's muted flag when no
//! control can be located or the host UI already shows the target state.
//!
//! Unmuting is gated behind the global unlock: until a user gesture has
//! sanctioned audible playback, nothing here ever unmutes a video.

mod matcher;
mod poller;

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use reelsync_model::VideoId;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::engine::Reconciler;
use crate::error::Result;
use crate::guard::FailureGuard;
use crate::ports::PageSurface;
use crate::registry::{VideoHandle, VideoRegistry};
use crate::telemetry::Telemetry;
use crate::timing::{FloodGate, MinInterval, retry_until};
use crate::tuning::EngineTuning;

pub use matcher::{
    HostMuteState, MatchedControl, MatcherChain, MatcherConfig, MatcherKind,
};

/// Keeps element muted flags, the host's mute UI, and the session's audio
/// sanction consistent with each other. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MuteSync {
    page: Arc<dyn PageSurface>,
    registry: Arc<VideoRegistry>,
    engine: Reconciler,
    matcher: MatcherChain,
    guard: FailureGuard,
    telemetry: Arc<Telemetry>,
    tuning: Arc<EngineTuning>,
    /// Spaces out host control activations; the host debounces its own
    /// button and swallows faster clicks.
    action_gate: Arc<MinInterval>,
    flood: Arc<FloodGate>,
    pollers: Arc<DashMap<VideoId, JoinHandle<()>>>,
}

impl fmt::Debug for MuteSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MuteSync")
            .field("pollers", &self.pollers.len())
            .finish_non_exhaustive()
    }
}

impl MuteSync {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        page: Arc<dyn PageSurface>,
        registry: Arc<VideoRegistry>,
        engine: Reconciler,
        guard: FailureGuard,
        telemetry: Arc<Telemetry>,
        matcher_config: MatcherConfig,
        tuning: EngineTuning,
    ) -> Self {
        let action_gate = Arc::new(MinInterval::new(tuning.mute_action_interval));
        let flood = Arc::new(FloodGate::new(tuning.flood_window, tuning.flood_burst));
        Self {
            page,
            registry,
            engine,
            matcher: MatcherChain::new(matcher_config),
            guard,
            telemetry,
            tuning: Arc::new(tuning),
            action_gate,
            flood,
            pollers: Arc::new(DashMap::new()),
        }
    }

    /// Starts the mute poll for a freshly adopted video, replacing any
    /// poll already running for the same id.
    pub fn attach(&self, handle: &Arc<VideoHandle>) {
        let task = tokio::spawn(poller::poll_mute_state(
            self.clone(),
            Arc::clone(handle),
        ));
        if let Some(old) = self.pollers.insert(handle.id(), task) {
            old.abort();
        }
    }

    pub fn detach(&self, video: VideoId) {
        if let Some((_, task)) = self.pollers.remove(&video) {
            task.abort();
        }
    }

    pub fn shutdown(&self) {
        for entry in self.pollers.iter() {
            entry.value().abort();
        }
        self.pollers.clear();
    }

    /// Locates the host mute control for a video through the matcher
    /// chain.
    pub fn locate_control(&self, handle: &Arc<VideoHandle>) -> Option<MatchedControl> {
        let candidates = self.page.mute_control_candidates(handle.id());
        if candidates.is_empty() {
            return None;
        }
        let matched = self
            .matcher
            .locate(&candidates, handle.surface().bounding_box());
        if matched.is_none() {
            debug!(video = %handle.id(), "no mute control matched");
            self.telemetry.count("muteSync.noMatch");
        }
        matched
    }

    /// Toggles mute for the whole feed, anchored on one video. A user
    /// gesture drives this, so the unmute direction also lifts the global
    /// lock.
    pub async fn toggle_mute(&self, handle: &Arc<VideoHandle>) -> Result<bool> {
        let target = !handle.surface().muted();
        if !target {
            self.engine.unlock_global_mute();
        }

        let clicked = match self.locate_control(handle) {
            Some(matched)
                if click_achieves(&matched, target)
                    && self.flood.allow("muteSync.click")
                    && self.action_gate.try_acquire() =>
            {
                self.guard
                    .run_sync("muteSync.click", || matched.control.activate())
                    .is_ok()
            }
            _ => false,
        };

        if clicked {
            sleep(self.tuning.host_click_settle).await;
            let muted = handle.surface().muted();
            handle.note_muted(muted);
            if muted == target {
                self.telemetry.count("muteSync.toggled");
                self.sync_all_to(target, Some(handle.id()));
                return Ok(target);
            }
            trace!(video = %handle.id(), "host click did not land, writing element");
        }

        handle.note_muted(target);
        self.guard
            .run_sync("muteSync.directToggle", || handle.surface().set_muted(target))?;
        self.telemetry.count("muteSync.toggled");
        self.sync_all_to(target, Some(handle.id()));
        Ok(target)
    }

    /// Reacts to the user activating the host's own mute control. The
    /// host flips its UI and the element on its side; after the settle
    /// delay the element state is authoritative.
    pub async fn on_host_mute_clicked(&self, video: VideoId) {
        let Some(handle) = self.registry.get(video) else {
            return;
        };
        sleep(self.tuning.host_click_settle).await;
        let muted = handle.surface().muted();
        handle.note_muted(muted);
        if !muted {
            self.engine.unlock_global_mute();
        }
        debug!(video = %handle.id(), muted, "host mute gesture settled");
        self.telemetry.count("muteSync.hostGesture");
        self.sync_all_to(muted, Some(handle.id()));
    }

    /// Brings every tracked video to the given muted state. The unmute
    /// direction is refused while the global lock is still down.
    pub fn sync_all_to(&self, muted: bool, skip: Option<VideoId>) {
        if !muted && !self.engine.global_mute_unlocked() {
            return;
        }
        for handle in self.registry.connected() {
            if skip == Some(handle.id()) {
                continue;
            }
            if handle.surface().muted() == muted {
                handle.note_muted(muted);
                continue;
            }
            handle.note_muted(muted);
            let _ = self
                .guard
                .run_sync("muteSync.propagate", || handle.surface().set_muted(muted));
        }
    }

    /// Drives a muted video to unmuted over the retry schedule, fighting
    /// host scripts that re-mute. No-op while the global lock is down.
    pub fn spawn_force_unmute(&self, handle: Arc<VideoHandle>) -> JoinHandle<bool> {
        let sync = self.clone();
        tokio::spawn(async move {
            if !sync.engine.global_mute_unlocked() {
                return false;
            }
            let schedule = sync.tuning.unmute_schedule.clone();
            let done = retry_until(&schedule, |attempt| {
                let sync = sync.clone();
                let handle = Arc::clone(&handle);
                async move { sync.attempt_unmute(&handle, attempt).await }
            })
            .await;
            if done {
                sync.telemetry.count("muteSync.forcedUnmute");
            } else {
                debug!(video = %handle.id(), "forced unmute exhausted its schedule");
                sync.telemetry.count("muteSync.unmuteExhausted");
            }
            done
        })
    }

    async fn attempt_unmute(&self, handle: &Arc<VideoHandle>, attempt: usize) -> bool {
        if !handle.is_connected() {
            return true;
        }
        if !handle.surface().muted() {
            handle.note_muted(false);
            return true;
        }
        trace!(video = %handle.id(), attempt, "unmute attempt");

        if let Some(matched) = self.locate_control(handle) {
            if matched.state != HostMuteState::Unmuted
                && self.flood.allow("muteSync.click")
                && self.action_gate.try_acquire()
            {
                if self
                    .guard
                    .run_sync("muteSync.click", || matched.control.activate())
                    .is_ok()
                {
                    sleep(self.tuning.host_click_settle).await;
                    let muted = handle.surface().muted();
                    handle.note_muted(muted);
                    return !muted;
                }
                return false;
            }
        }

        // No usable control this attempt: write the element directly.
        handle.note_muted(false);
        let _ = self
            .guard
            .run_sync("muteSync.directUnmute", || handle.surface().set_muted(false));
        !handle.surface().muted()
    }
}

/// Whether a single toggle click on the located control would land the
/// element on the target state. A desynced host UI flips the wrong way.
fn click_achieves(matched: &MatchedControl, target_muted: bool) -> bool {
    match matched.state {
        HostMuteState::Muted => !target_muted,
        HostMuteState::Unmuted => target_muted,
        HostMuteState::Unknown => true,
    }
}
