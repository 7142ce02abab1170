//! Top-level composition root.
//!
//! One [`SyncContext`] per page owns every component and every background
//! task. The embedder builds it from its four port implementations, calls
//! [`SyncContext::start`] once the document is ready, forwards page events
//! and commands, and calls [`SyncContext::shutdown`] on unload.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use reelsync_model::{StoreChange, VideoId};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::Reconciler;
use crate::error::Result;
use crate::events::{Command, CommandAck, PageEvent};
use crate::guard::FailureGuard;
use crate::mute::{MatcherConfig, MuteSync};
use crate::ports::{
    NoticeSink, PageSurface, PipPlatform, ScrollDirection, SettingsStore,
};
use crate::registry::{RegistryEvent, VideoHandle, VideoRegistry, VideoScanner};
use crate::session::{KeyboardControls, Navigator, PipManager};
use crate::settings::SettingsTransfer;
use crate::store::PreferenceStore;
use crate::telemetry::Telemetry;
use crate::tuning::EngineTuning;

/// Configures and assembles a [`SyncContext`].
pub struct SyncContextBuilder {
    page: Arc<dyn PageSurface>,
    store: Arc<dyn SettingsStore>,
    pip: Arc<dyn PipPlatform>,
    notices: Arc<dyn NoticeSink>,
    tuning: EngineTuning,
    matcher: MatcherConfig,
    app_version: Option<String>,
}

impl fmt::Debug for SyncContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContextBuilder")
            .field("app_version", &self.app_version)
            .finish_non_exhaustive()
    }
}

impl SyncContextBuilder {
    /// Replaces the default tuning.
    pub fn tuning(mut self, tuning: EngineTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Replaces the default mute-control matcher signatures.
    pub fn matcher_config(mut self, matcher: MatcherConfig) -> Self {
        self.matcher = matcher;
        self
    }

    /// Version recorded in the install history at startup.
    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    pub fn build(self) -> SyncContext {
        let store = PreferenceStore::new(self.store);
        let telemetry = Arc::new(Telemetry::new(store.clone(), &self.tuning));
        let guard = FailureGuard::new(Arc::clone(&telemetry));
        let registry = Arc::new(VideoRegistry::new());
        let scanner = Arc::new(VideoScanner::new(
            Arc::clone(&self.page),
            Arc::clone(&registry),
        ));
        let engine = Reconciler::new(
            store.clone(),
            Arc::clone(&registry),
            Arc::clone(&telemetry),
            guard.clone(),
            self.tuning.clone(),
        );
        let mute = MuteSync::new(
            Arc::clone(&self.page),
            Arc::clone(&registry),
            engine.clone(),
            guard.clone(),
            Arc::clone(&telemetry),
            self.matcher,
            self.tuning.clone(),
        );
        let pip = PipManager::new(
            Arc::clone(&self.page),
            self.pip,
            Arc::clone(&registry),
            Arc::clone(&self.notices),
            guard.clone(),
            Arc::clone(&telemetry),
            self.tuning.clone(),
        );
        let navigator = Navigator::new(
            Arc::clone(&self.page),
            Arc::clone(&registry),
            engine.clone(),
            mute.clone(),
            pip.clone(),
            guard,
            Arc::clone(&telemetry),
            self.tuning.clone(),
        );
        let keyboard = KeyboardControls::new(
            engine.clone(),
            mute.clone(),
            navigator.clone(),
            pip.clone(),
            Arc::clone(&registry),
            Arc::clone(&self.page),
            Arc::clone(&self.notices),
            self.tuning.clone(),
        );
        let settings = SettingsTransfer::new(
            store.clone(),
            Arc::clone(&self.notices),
            Arc::clone(&telemetry),
        );

        SyncContext {
            page: self.page,
            store,
            telemetry,
            registry,
            scanner,
            engine,
            mute,
            pip,
            navigator,
            keyboard,
            settings,
            tuning: Arc::new(self.tuning),
            app_version: self.app_version,
            tasks: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }
}

/// The per-page engine instance.
pub struct SyncContext {
    page: Arc<dyn PageSurface>,
    store: PreferenceStore,
    telemetry: Arc<Telemetry>,
    registry: Arc<VideoRegistry>,
    scanner: Arc<VideoScanner>,
    engine: Reconciler,
    mute: MuteSync,
    pip: PipManager,
    navigator: Navigator,
    keyboard: KeyboardControls,
    settings: SettingsTransfer,
    tuning: Arc<EngineTuning>,
    app_version: Option<String>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("started", &self.started.load(Ordering::SeqCst))
            .field("tracked", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl SyncContext {
    pub fn builder(
        page: Arc<dyn PageSurface>,
        store: Arc<dyn SettingsStore>,
        pip: Arc<dyn PipPlatform>,
        notices: Arc<dyn NoticeSink>,
    ) -> SyncContextBuilder {
        SyncContextBuilder {
            page,
            store,
            pip,
            notices,
            tuning: EngineTuning::default(),
            matcher: MatcherConfig::default(),
            app_version: None,
        }
    }

    /// Loads preferences, scans the page, and spawns the background loops.
    /// A second call after success is a no-op; starting twice must not
    /// duplicate store writes or listeners. A failed start leaves the
    /// context unstarted so the embedder can retry.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("context already started");
            return Ok(());
        }

        if let Err(err) = self.engine.load_preferences().await {
            self.started.store(false, Ordering::SeqCst);
            return Err(err);
        }
        if let Some(version) = &self.app_version {
            if let Err(err) = self.telemetry.record_version(version).await {
                warn!("version bookkeeping failed: {err}");
                self.telemetry.count_error("recordVersion");
            }
        }

        // Subscriptions predate the first scan so initial adoptions are
        // observed like any later ones.
        let registry_events = self.registry.subscribe();
        let store_changes = self.store.subscribe();
        let adopted = self.scanner.scan();
        debug!(
            adopted,
            version = self.app_version.as_deref().unwrap_or("unset"),
            "context started"
        );

        let mut tasks = self.tasks.lock();
        tasks.push(self.spawn_registry_loop(registry_events));
        tasks.push(self.spawn_store_loop(store_changes));
        tasks.push(
            Arc::clone(&self.scanner).spawn_rescan(self.tuning.rescan_interval),
        );
        Ok(())
    }

    /// Routes one page event. Returns true when the event was consumed
    /// and the embedder should stop its propagation; only key events are
    /// ever consumed.
    pub fn handle_event(&self, event: PageEvent) -> bool {
        match event {
            PageEvent::VideosMutated | PageEvent::VisibilityChanged { .. } => {
                self.scanner.scan();
                false
            }
            PageEvent::PageHide => {
                let telemetry = Arc::clone(&self.telemetry);
                tokio::spawn(async move {
                    if let Err(err) = telemetry.flush_now().await {
                        warn!("page-hide counter flush failed: {err}");
                    }
                });
                false
            }
            PageEvent::VideoVolumeChanged {
                video,
                volume,
                muted,
            } => {
                if let Some(handle) = self.tracked(video.id()) {
                    self.engine.observe_volume(&handle, volume, muted);
                }
                false
            }
            PageEvent::VideoRateChanged { video, rate } => {
                if let Some(handle) = self.tracked(video.id()) {
                    self.engine.observe_rate(&handle, rate);
                }
                false
            }
            PageEvent::HostMuteClicked { video } => {
                let mute = self.mute.clone();
                tokio::spawn(async move {
                    mute.on_host_mute_clicked(video).await;
                });
                false
            }
            PageEvent::KeyDown { input } => self.keyboard.on_key_down(&input),
            PageEvent::KeyUp { input } => {
                self.keyboard.on_key_up(&input);
                false
            }
            PageEvent::StandardPipEntered { video } => {
                let pip = self.pip.clone();
                tokio::spawn(async move {
                    pip.on_standard_pip_entered(video).await;
                });
                false
            }
            PageEvent::CompanionClosed => {
                let pip = self.pip.clone();
                tokio::spawn(async move {
                    pip.on_companion_closed().await;
                });
                false
            }
        }
    }

    /// Handles an embedder command, acknowledging before any spawned work
    /// runs.
    pub fn handle_command(&self, command: Command) -> CommandAck {
        match command {
            Command::NextReel => self.ack_navigation(ScrollDirection::Next),
            Command::PreviousReel => self.ack_navigation(ScrollDirection::Previous),
            Command::VolumeStep { up } => {
                self.engine.step_volume(up);
                CommandAck::Accepted
            }
            Command::RateStep { up } => {
                self.engine.step_rate(up);
                CommandAck::Accepted
            }
            Command::RateReset => {
                self.engine.reset_rate();
                CommandAck::Accepted
            }
            Command::TogglePictureInPicture => {
                if !self.pip.is_open()
                    && self
                        .registry
                        .most_visible(
                            self.page.viewport(),
                            self.tuning.visible_min_height,
                        )
                        .is_none()
                {
                    return CommandAck::Dropped;
                }
                let pip = self.pip.clone();
                tokio::spawn(async move {
                    let _ = pip.toggle().await;
                });
                CommandAck::Accepted
            }
        }
    }

    /// Stops background work, restores any relocated video, and flushes
    /// pending counters.
    pub async fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.mute.shutdown();
        let _ = self.pip.close().await;
        if let Err(err) = self.telemetry.flush_now().await {
            warn!("shutdown counter flush failed: {err}");
        }
        debug!("context shut down");
    }

    pub fn engine(&self) -> &Reconciler {
        &self.engine
    }

    pub fn registry(&self) -> &Arc<VideoRegistry> {
        &self.registry
    }

    pub fn mute_sync(&self) -> &MuteSync {
        &self.mute
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn pip(&self) -> &PipManager {
        &self.pip
    }

    pub fn keyboard(&self) -> &KeyboardControls {
        &self.keyboard
    }

    pub fn settings(&self) -> &SettingsTransfer {
        &self.settings
    }

    pub fn telemetry(&self) -> &Arc<Telemetry> {
        &self.telemetry
    }

    /// Handle for a video the embedder reported activity on. An unknown id
    /// triggers one scan; activity usually means a mutation was missed.
    fn tracked(&self, id: VideoId) -> Option<Arc<VideoHandle>> {
        if let Some(handle) = self.registry.get(id) {
            return Some(handle);
        }
        self.scanner.scan();
        self.registry.get(id)
    }

    fn ack_navigation(&self, direction: ScrollDirection) -> CommandAck {
        if self.navigator.navigate(direction) {
            CommandAck::Accepted
        } else {
            CommandAck::Dropped
        }
    }

    fn spawn_registry_loop(
        &self,
        mut events: tokio::sync::broadcast::Receiver<RegistryEvent>,
    ) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let mute = self.mute.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(RegistryEvent::Registered(handle)) => {
                        mute.attach(&handle);
                        if engine.global_mute_unlocked() && handle.surface().muted() {
                            let _ = mute.spawn_force_unmute(Arc::clone(&handle));
                        }
                        let _ = engine.schedule_adoption_apply(handle);
                    }
                    Ok(RegistryEvent::Removed(id)) => {
                        mute.detach(id);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "registry event stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn spawn_store_loop(
        &self,
        mut changes: tokio::sync::broadcast::Receiver<StoreChange>,
    ) -> JoinHandle<()> {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => engine.on_store_changed(&change),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "store change stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Drop for SyncContext {
    fn drop(&mut self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.mute.shutdown();
    }
}
