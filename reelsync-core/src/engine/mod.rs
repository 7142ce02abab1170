//! Value reconciliation between videos, session memory, the preference
//! store, and other tabs.
//!
//! One engine instance runs per page context. All mutations funnel through
//! it: observed player changes update session memory and persist on a
//! debounce, store notifications from other tabs apply after hotkey
//! correlation, and hotkey commands adjust every tracked video at once.
//! The significance threshold makes the whole loop convergent; an echo of
//! a value the engine itself produced never differs enough to re-trigger.

mod correlation;
mod state;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use reelsync_model::{
    PlaybackRate, PreferenceSet, StoreChange, StoreDelta, StoreKey, VideoId, Volume,
};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::error::{Result, SyncError};
use crate::guard::FailureGuard;
use crate::registry::{VideoHandle, VideoRegistry};
use crate::store::{PreferenceStore, resolve_preferences};
use crate::telemetry::Telemetry;
use crate::timing::{Debouncer, run_at_offsets};
use crate::tuning::EngineTuning;

use correlation::await_witness;
pub use correlation::HotkeyWitness;
pub use state::ReconciledState;

/// Store write queued behind the change debounce. Later writes for the
/// same dimension supersede earlier ones within a burst.
enum PendingWrite {
    Volume(Volume),
    Rate(PlaybackRate),
}

/// The reconciliation engine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Reconciler {
    store: PreferenceStore,
    registry: Arc<VideoRegistry>,
    state: Arc<Mutex<ReconciledState>>,
    witness: Arc<HotkeyWitness>,
    guard: FailureGuard,
    telemetry: Arc<Telemetry>,
    tuning: Arc<EngineTuning>,
    persist: Arc<Debouncer<PendingWrite>>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        store: PreferenceStore,
        registry: Arc<VideoRegistry>,
        telemetry: Arc<Telemetry>,
        guard: FailureGuard,
        tuning: EngineTuning,
    ) -> Self {
        let state = Arc::new(Mutex::new(ReconciledState::default()));
        let persist = Arc::new(spawn_persist_debouncer(
            store.clone(),
            Arc::clone(&state),
            guard.clone(),
            tuning.change_debounce,
        ));
        Self {
            store,
            registry,
            state,
            witness: Arc::new(HotkeyWitness::new()),
            guard,
            telemetry,
            tuning: Arc::new(tuning),
            persist,
        }
    }

    /// Loads preferences from the store into session state. Called once at
    /// context startup, before any video is adopted.
    pub async fn load_preferences(&self) -> Result<()> {
        let loaded = self.store.load().await?;
        self.state.lock().preferences = loaded.preferences;
        Ok(())
    }

    /// Ingests a volume or muted change observed on a video, whatever
    /// actor caused it.
    pub fn observe_volume(&self, video: &Arc<VideoHandle>, volume: f64, muted: bool) {
        video.note_muted(muted);
        let volume = Volume::new(volume);
        {
            let mut state = self.state.lock();
            if !muted && !state.global_mute_unlocked() {
                state.unlock_global_mute();
                debug!("audible playback sanctioned by observed unmute");
            }
            if !volume
                .differs_from(state.volume_to_apply(), self.tuning.min_significant_delta)
            {
                return;
            }
            state.note_local_volume(volume);
        }
        trace!(video = %video.id(), %volume, "observed volume change");
        self.persist.push(PendingWrite::Volume(volume));
        self.write_volume_to_videos(volume, Some(video.id()));
    }

    /// Ingests a playback-rate change observed on a video.
    pub fn observe_rate(&self, video: &Arc<VideoHandle>, rate: f64) {
        let rate = PlaybackRate::new(rate);
        {
            let mut state = self.state.lock();
            if !rate
                .differs_from(state.rate_to_apply(), self.tuning.min_significant_delta)
            {
                return;
            }
            state.note_local_rate(rate);
        }
        trace!(video = %video.id(), %rate, "observed rate change");
        self.persist.push(PendingWrite::Rate(rate));
        self.write_rate_to_videos(rate, Some(video.id()));
    }

    /// Reacts to a store change notification, from this tab or another.
    ///
    /// Preferences always refresh from the notification snapshot. Volume
    /// and rate values additionally apply to the videos, but only after
    /// hotkey correlation decides the change is safe to act on, and never
    /// over fresher local activity.
    pub fn on_store_changed(&self, change: &StoreChange) {
        let prefs = resolve_preferences(&change.snapshot);
        let staged_at = Instant::now();
        let mut remote_volume = None;
        let mut remote_rate = None;
        {
            let mut state = self.state.lock();
            if state.preferences.debug != prefs.debug {
                debug!(debug = prefs.debug, "debug preference changed");
            }
            // Baselines predate the refresh. Once the new preferences are
            // in, a stored value with no session override would compare
            // equal to its own fallback and never stage.
            let prior_volume = state.volume_to_apply();
            let prior_rate = state.rate_to_apply();
            state.preferences = prefs;

            if state.preferences.remember_volume
                && change.touches(StoreKey::VolumeLevel)
                && !state.volume_changed_within(self.tuning.change_debounce)
                && let Some(volume) = change
                    .change_for(StoreKey::VolumeLevel)
                    .and_then(|c| c.new.as_ref())
                    .and_then(|v| v.coerce_number())
                    .and_then(Volume::try_new)
                && volume.differs_from(prior_volume, self.tuning.min_significant_delta)
            {
                remote_volume = Some(volume);
            }

            if state.preferences.remember_rate
                && change.touches(StoreKey::PlaybackRate)
                && !state.rate_changed_within(self.tuning.change_debounce)
                && let Some(rate) = change
                    .change_for(StoreKey::PlaybackRate)
                    .and_then(|c| c.new.as_ref())
                    .and_then(|v| v.coerce_number())
                    .and_then(PlaybackRate::try_new)
                && rate.differs_from(prior_rate, self.tuning.min_significant_delta)
            {
                remote_rate = Some(rate);
            }
        }

        if remote_volume.is_none() && remote_rate.is_none() {
            return;
        }
        let engine = self.clone();
        tokio::spawn(async move {
            let witnessed = await_witness(&engine.witness, &engine.tuning).await;
            engine.finish_remote_apply(remote_volume, remote_rate, staged_at, witnessed);
        });
    }

    /// Second half of a store-change apply, after witness correlation.
    /// Local activity since staging wins over the incoming value.
    fn finish_remote_apply(
        &self,
        volume: Option<Volume>,
        rate: Option<PlaybackRate>,
        staged_at: Instant,
        witnessed: bool,
    ) {
        if let Some(volume) = volume {
            let apply = {
                let mut state = self.state.lock();
                let overtaken = state
                    .last_local_volume_change
                    .is_some_and(|at| at > staged_at);
                if !overtaken {
                    state.session_volume = Some(volume);
                }
                !overtaken
            };
            if apply {
                debug!(%volume, witnessed, "applying store volume change");
                self.write_volume_to_videos(volume, None);
                self.telemetry.count("volume.storeApplied");
            }
        }
        if let Some(rate) = rate {
            let apply = {
                let mut state = self.state.lock();
                let overtaken = state
                    .last_local_rate_change
                    .is_some_and(|at| at > staged_at);
                if !overtaken {
                    state.session_rate = Some(rate);
                }
                !overtaken
            };
            if apply {
                debug!(%rate, witnessed, "applying store rate change");
                self.write_rate_to_videos(rate, None);
                self.telemetry.count("rate.storeApplied");
            }
        }
    }

    /// Applies the reconciled volume and rate to one video. Mute is owned
    /// by the mute sync and deliberately untouched here.
    pub fn apply_settings_to(&self, handle: &Arc<VideoHandle>) -> Result<()> {
        let (volume, rate) = {
            let state = self.state.lock();
            (state.volume_to_apply(), state.rate_to_apply())
        };
        let min = self.tuning.min_significant_delta;
        let surface = Arc::clone(handle.surface());
        let id = handle.id();
        let result = self.guard.run_sync("applySettings", move || {
            if !surface.is_connected() {
                return Err(SyncError::NotFound(format!("video {id} detached")));
            }
            if Volume::new(surface.volume()).differs_from(volume, min) {
                surface.set_volume(volume.value())?;
            }
            if PlaybackRate::new(surface.playback_rate()).differs_from(rate, min) {
                surface.set_playback_rate(rate.value())?;
            }
            Ok(())
        });
        if result.is_ok() {
            self.telemetry.count("settings.applied");
        }
        result
    }

    /// Applies the reconciled settings to every tracked video, skipping
    /// past per-video failures.
    pub fn apply_to_all(&self) {
        for handle in self.registry.connected() {
            let _ = self.apply_settings_to(&handle);
        }
    }

    /// Re-asserts settings on a freshly adopted video over the early
    /// window in which host scripts tend to reset them.
    pub fn schedule_adoption_apply(&self, handle: Arc<VideoHandle>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let schedule = engine.tuning.apply_schedule.clone();
            run_at_offsets(&schedule, |_| {
                let engine = engine.clone();
                let handle = Arc::clone(&handle);
                async move {
                    if handle.is_connected() {
                        let _ = engine.apply_settings_to(&handle);
                    }
                }
            })
            .await;
        })
    }

    /// Steps the volume by the configured step and applies it everywhere.
    pub fn step_volume(&self, up: bool) -> Volume {
        let next = {
            let state = self.state.lock();
            let step = state.preferences.effective_volume_step();
            state
                .volume_to_apply()
                .stepped(if up { step } else { -step })
        };
        self.set_volume_local(next);
        next
    }

    /// Jumps the volume straight to a fraction, the digit-hotkey path.
    pub fn set_quick_volume(&self, fraction: f64) -> Volume {
        let next = Volume::new(fraction);
        self.set_volume_local(next);
        next
    }

    /// Steps the rate by the configured step, snapped onto the step grid
    /// so drifted rates land back on round values.
    pub fn step_rate(&self, up: bool) -> PlaybackRate {
        let next = {
            let state = self.state.lock();
            let step = state.preferences.effective_rate_step();
            state
                .rate_to_apply()
                .stepped(if up { step } else { -step })
                .snapped_to(step)
        };
        self.set_rate_local(next);
        next
    }

    pub fn reset_rate(&self) -> PlaybackRate {
        self.set_rate_local(PlaybackRate::NORMAL);
        PlaybackRate::NORMAL
    }

    fn set_volume_local(&self, volume: Volume) {
        self.state.lock().note_local_volume(volume);
        self.persist.push(PendingWrite::Volume(volume));
        self.write_volume_to_videos(volume, None);
        self.telemetry.count("volume.adjusted");
    }

    fn set_rate_local(&self, rate: PlaybackRate) {
        self.state.lock().note_local_rate(rate);
        self.persist.push(PendingWrite::Rate(rate));
        self.write_rate_to_videos(rate, None);
        self.telemetry.count("rate.adjusted");
    }

    fn write_volume_to_videos(&self, volume: Volume, skip: Option<VideoId>) {
        for handle in self.registry.connected() {
            if skip == Some(handle.id()) {
                continue;
            }
            let surface = handle.surface();
            if Volume::new(surface.volume())
                .differs_from(volume, self.tuning.min_significant_delta)
            {
                let _ = self
                    .guard
                    .run_sync("writeVolume", || surface.set_volume(volume.value()));
            }
        }
    }

    fn write_rate_to_videos(&self, rate: PlaybackRate, skip: Option<VideoId>) {
        for handle in self.registry.connected() {
            if skip == Some(handle.id()) {
                continue;
            }
            let surface = handle.surface();
            if PlaybackRate::new(surface.playback_rate())
                .differs_from(rate, self.tuning.min_significant_delta)
            {
                let _ = self
                    .guard
                    .run_sync("writeRate", || surface.set_playback_rate(rate.value()));
            }
        }
    }

    pub fn witness(&self) -> &HotkeyWitness {
        &self.witness
    }

    pub fn preferences(&self) -> PreferenceSet {
        self.state.lock().preferences.clone()
    }

    pub fn volume_to_apply(&self) -> Volume {
        self.state.lock().volume_to_apply()
    }

    pub fn rate_to_apply(&self) -> PlaybackRate {
        self.state.lock().rate_to_apply()
    }

    pub fn global_mute_unlocked(&self) -> bool {
        self.state.lock().global_mute_unlocked()
    }

    /// Sanctions audible playback. Called on direct user mute gestures,
    /// which by definition carry audio intent.
    pub fn unlock_global_mute(&self) {
        self.state.lock().unlock_global_mute();
    }

    pub fn tuning(&self) -> &EngineTuning {
        &self.tuning
    }
}

fn spawn_persist_debouncer(
    store: PreferenceStore,
    state: Arc<Mutex<ReconciledState>>,
    guard: FailureGuard,
    window: Duration,
) -> Debouncer<PendingWrite> {
    Debouncer::spawn(window, move |writes: Vec<PendingWrite>| {
        let store = store.clone();
        let state = Arc::clone(&state);
        let guard = guard.clone();
        async move {
            let mut volume = None;
            let mut rate = None;
            for write in writes {
                match write {
                    PendingWrite::Volume(v) => volume = Some(v),
                    PendingWrite::Rate(r) => rate = Some(r),
                }
            }
            let (remember_volume, remember_rate) = {
                let state = state.lock();
                (
                    state.preferences.remember_volume,
                    state.preferences.remember_rate,
                )
            };
            let mut delta = StoreDelta::new();
            if remember_volume {
                if let Some(volume) = volume {
                    delta.set(StoreKey::VolumeLevel, volume.value());
                }
            }
            if remember_rate {
                if let Some(rate) = rate {
                    delta.set(StoreKey::PlaybackRate, rate.value());
                }
            }
            if delta.is_empty() {
                return;
            }
            let _ = guard.run("persistSettings", || store.write(delta)).await;
        }
    })
}
