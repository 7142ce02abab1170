use std::fmt;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, trace};

use crate::engine::Reconciler;
use crate::guard::FailureGuard;
use crate::mute::MuteSync;
use crate::ports::{PageSurface, ScrollDirection};
use crate::registry::VideoRegistry;
use crate::session::pip::PipManager;
use crate::telemetry::Telemetry;
use crate::timing::MinInterval;
use crate::tuning::EngineTuning;

/// Drives reel-to-reel movement and the settle pass that follows it.
///
/// The host feed animates its snap scroll for several hundred
/// milliseconds; starting a second scroll mid-animation lands between
/// reels. Requests inside the cooldown are therefore dropped outright.
#[derive(Clone)]
pub struct Navigator {
    page: Arc<dyn PageSurface>,
    registry: Arc<VideoRegistry>,
    engine: Reconciler,
    mute: MuteSync,
    pip: PipManager,
    guard: FailureGuard,
    telemetry: Arc<Telemetry>,
    tuning: Arc<EngineTuning>,
    gate: Arc<MinInterval>,
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator").finish_non_exhaustive()
    }
}

impl Navigator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        page: Arc<dyn PageSurface>,
        registry: Arc<VideoRegistry>,
        engine: Reconciler,
        mute: MuteSync,
        pip: PipManager,
        guard: FailureGuard,
        telemetry: Arc<Telemetry>,
        tuning: EngineTuning,
    ) -> Self {
        let gate = Arc::new(MinInterval::new(tuning.navigation_interval));
        Self {
            page,
            registry,
            engine,
            mute,
            pip,
            guard,
            telemetry,
            tuning: Arc::new(tuning),
            gate,
        }
    }

    /// Starts a navigation in the given direction. Returns false when the
    /// request falls inside the cooldown and was dropped.
    pub fn navigate(&self, direction: ScrollDirection) -> bool {
        if !self.gate.try_acquire() {
            trace!(?direction, "navigation inside cooldown, dropped");
            return false;
        }
        self.telemetry.count(match direction {
            ScrollDirection::Next => "navigation.next",
            ScrollDirection::Previous => "navigation.previous",
        });
        let navigator = self.clone();
        tokio::spawn(async move { navigator.run(direction).await });
        true
    }

    async fn run(self, direction: ScrollDirection) {
        let container = self.resolve_container();
        debug!(?direction, ?container, "navigating");
        if self
            .guard
            .run("navigation.scroll", || {
                self.page.scroll_container(container, direction)
            })
            .await
            .is_err()
        {
            return;
        }
        sleep(self.tuning.navigation_settle).await;
        self.settle().await;
    }

    /// Picks the element to scroll. A snap container is the feed itself;
    /// a scrollable ancestor of a video is the next best guess; with
    /// neither, the document scrolls.
    fn resolve_container(&self) -> Option<u64> {
        let containers = self.page.scroll_containers();
        if let Some(feed) = containers
            .iter()
            .find(|c| c.vertical_snap && c.scrollable)
        {
            return Some(feed.id);
        }
        containers
            .iter()
            .find(|c| c.scrollable && c.contains_video)
            .map(|c| c.id)
    }

    /// Post-navigation pass: the reel under the viewport center changed,
    /// so saved settings re-assert on every player and sanctioned audio
    /// carries over to the new reel.
    async fn settle(&self) {
        self.engine.apply_to_all();
        if self.engine.global_mute_unlocked()
            && let Some(active) = self
                .registry
                .most_visible(self.page.viewport(), self.tuning.visible_min_height)
            && active.surface().muted()
        {
            let _ = self.mute.spawn_force_unmute(active);
        }
        self.pip.refresh_companion().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reelsync_model::Rect;
    use tokio::task::yield_now;
    use tokio::time::advance;

    use super::*;
    use crate::mute::MatcherConfig;
    use crate::ports::ScrollContainer;
    use crate::store::{MemoryStore, PreferenceStore};
    use crate::testing::{FakeNotices, FakePage, FakePip, FakeVideo};

    struct Harness {
        page: FakePage,
        registry: Arc<VideoRegistry>,
        engine: Reconciler,
        navigator: Navigator,
    }

    fn harness() -> Harness {
        let store = MemoryStore::new();
        let prefs = PreferenceStore::new(Arc::new(store));
        let telemetry = Arc::new(Telemetry::new(prefs.clone(), &EngineTuning::default()));
        let guard = FailureGuard::new(Arc::clone(&telemetry));
        let registry = Arc::new(VideoRegistry::new());
        let engine = Reconciler::new(
            prefs,
            Arc::clone(&registry),
            Arc::clone(&telemetry),
            guard.clone(),
            EngineTuning::default(),
        );
        let page = FakePage::new();
        let mute = MuteSync::new(
            page.surface(),
            Arc::clone(&registry),
            engine.clone(),
            guard.clone(),
            Arc::clone(&telemetry),
            MatcherConfig::default(),
            EngineTuning::default(),
        );
        let pip = PipManager::new(
            page.surface(),
            FakePip::new().platform(),
            Arc::clone(&registry),
            FakeNotices::new().sink(),
            guard.clone(),
            Arc::clone(&telemetry),
            EngineTuning::default(),
        );
        let navigator = Navigator::new(
            page.surface(),
            Arc::clone(&registry),
            engine.clone(),
            mute,
            pip,
            guard,
            telemetry,
            EngineTuning::default(),
        );
        Harness {
            page,
            registry,
            engine,
            navigator,
        }
    }

    fn snap_feed(id: u64) -> ScrollContainer {
        ScrollContainer {
            id,
            vertical_snap: true,
            scrollable: true,
            contains_video: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_requests_inside_cooldown_are_dropped() {
        let h = harness();
        h.page.set_containers(vec![snap_feed(1)]);

        assert!(h.navigator.navigate(ScrollDirection::Next));
        yield_now().await;
        advance(Duration::from_millis(200)).await;
        assert!(!h.navigator.navigate(ScrollDirection::Next));
        yield_now().await;

        assert_eq!(h.page.scrolls(), vec![(Some(1), ScrollDirection::Next)]);

        advance(Duration::from_millis(700)).await;
        assert!(h.navigator.navigate(ScrollDirection::Previous));
        yield_now().await;
        assert_eq!(h.page.scrolls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn snap_container_wins_over_plain_video_container() {
        let h = harness();
        h.page.set_containers(vec![
            ScrollContainer {
                id: 3,
                vertical_snap: false,
                scrollable: true,
                contains_video: true,
            },
            snap_feed(9),
        ]);

        h.navigator.navigate(ScrollDirection::Next);
        yield_now().await;

        assert_eq!(h.page.scrolls(), vec![(Some(9), ScrollDirection::Next)]);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_video_container_then_document() {
        let h = harness();
        h.page.set_containers(vec![
            ScrollContainer {
                id: 2,
                vertical_snap: true,
                scrollable: false,
                contains_video: false,
            },
            ScrollContainer {
                id: 7,
                vertical_snap: false,
                scrollable: true,
                contains_video: true,
            },
        ]);

        h.navigator.navigate(ScrollDirection::Next);
        yield_now().await;
        assert_eq!(h.page.scrolls(), vec![(Some(7), ScrollDirection::Next)]);

        advance(Duration::from_millis(900)).await;
        h.page.set_containers(Vec::new());
        h.navigator.navigate(ScrollDirection::Previous);
        yield_now().await;
        assert_eq!(h.page.scrolls().last(), Some(&(None, ScrollDirection::Previous)));
    }

    #[tokio::test(start_paused = true)]
    async fn settle_reasserts_settings_on_the_new_reel() {
        let h = harness();
        h.page.set_containers(vec![snap_feed(1)]);
        let video = FakeVideo::new()
            .with_bounds(Rect::new(0.0, 50.0, 400.0, 700.0))
            .with_volume(0.3);
        h.page.add_video(&video);
        h.registry.adopt(video.surface());

        h.navigator.navigate(ScrollDirection::Next);
        yield_now().await;
        advance(Duration::from_millis(700)).await;
        yield_now().await;

        // Stored preferences win back the drifted volume.
        assert!((video.volume() - 1.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_unmutes_the_new_reel_once_audio_is_sanctioned() {
        let h = harness();
        h.page.set_containers(vec![snap_feed(1)]);
        h.engine.unlock_global_mute();
        let video = FakeVideo::new()
            .with_bounds(Rect::new(0.0, 50.0, 400.0, 700.0))
            .start_muted();
        h.page.add_video(&video);
        h.registry.adopt(video.surface());

        h.navigator.navigate(ScrollDirection::Next);
        yield_now().await;
        advance(Duration::from_millis(700)).await;
        yield_now().await;
        // First forced-unmute attempt fires shortly after the settle.
        advance(Duration::from_millis(100)).await;
        yield_now().await;

        assert!(!video.is_muted());
    }
}
