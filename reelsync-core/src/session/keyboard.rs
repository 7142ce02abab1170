use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reelsync_model::{Key, KeyInput};
use tracing::trace;

use crate::engine::Reconciler;
use crate::mute::MuteSync;
use crate::ports::{NoticeSink, PageSurface, ScrollDirection};
use crate::registry::VideoRegistry;
use crate::session::navigation::Navigator;
use crate::session::pip::PipManager;
use crate::tuning::EngineTuning;

const FEEDBACK_DURATION: Duration = Duration::from_millis(1500);

/// Routes keyboard events to engine actions.
///
/// Arrow keys carry Ctrl on the host page, so the page's own arrow-key
/// feed scrolling keeps working; inside the companion window, which has
/// no competing handlers, bare arrows navigate. Alt and meta chords
/// belong to the browser, and anything typed into an editable element is
/// text, not a command.
#[derive(Clone)]
pub struct KeyboardControls {
    engine: Reconciler,
    mute: MuteSync,
    navigator: Navigator,
    pip: PipManager,
    registry: Arc<VideoRegistry>,
    page: Arc<dyn PageSurface>,
    notices: Arc<dyn NoticeSink>,
    tuning: Arc<EngineTuning>,
}

impl fmt::Debug for KeyboardControls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardControls").finish_non_exhaustive()
    }
}

impl KeyboardControls {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: Reconciler,
        mute: MuteSync,
        navigator: Navigator,
        pip: PipManager,
        registry: Arc<VideoRegistry>,
        page: Arc<dyn PageSurface>,
        notices: Arc<dyn NoticeSink>,
        tuning: EngineTuning,
    ) -> Self {
        Self {
            engine,
            mute,
            navigator,
            pip,
            registry,
            page,
            notices,
            tuning: Arc::new(tuning),
        }
    }

    /// Handles a keydown. Returns true when the key was consumed, in
    /// which case the embedder stops it from reaching the host page.
    pub fn on_key_down(&self, input: &KeyInput) -> bool {
        if input.from_editable || input.alt || input.meta {
            return false;
        }
        match &input.key {
            // Bare arrows stay with the host page outside the companion
            // window; its feed already scrolls on them.
            Key::ArrowUp if input.ctrl => {
                self.step_volume_up();
                true
            }
            Key::ArrowDown if input.ctrl => {
                let next = self.engine.step_volume(false);
                self.show_volume(next.value());
                true
            }
            Key::ArrowUp | Key::ArrowLeft
                if input.ctrl || input.from_companion =>
            {
                self.navigator.navigate(ScrollDirection::Previous);
                true
            }
            Key::ArrowDown | Key::ArrowRight
                if input.ctrl || input.from_companion =>
            {
                self.navigator.navigate(ScrollDirection::Next);
                true
            }
            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight => {
                false
            }
            _ if input.ctrl => false,
            Key::Plus => {
                self.step_volume_up();
                true
            }
            Key::Minus => {
                let next = self.engine.step_volume(false);
                self.show_volume(next.value());
                true
            }
            Key::M => {
                self.toggle_mute_on_active();
                true
            }
            Key::P => {
                let pip = self.pip.clone();
                tokio::spawn(async move {
                    let _ = pip.toggle().await;
                });
                true
            }
            Key::Digit(_) => {
                if let Some(fraction) = input.key.quick_volume() {
                    let next = self.engine.set_quick_volume(fraction);
                    if fraction > 0.0 {
                        self.unmute_on_audio_intent();
                    }
                    self.show_volume(next.value());
                }
                true
            }
            Key::Other(_) => false,
        }
    }

    /// Handles a keyup. Value-changing keys leave a witness so a store
    /// change echoing back from this hotkey is recognized as local.
    pub fn on_key_up(&self, input: &KeyInput) {
        if input.from_editable {
            return;
        }
        match &input.key {
            Key::ArrowUp
            | Key::ArrowDown
            | Key::Plus
            | Key::Minus
            | Key::Digit(_) => self.engine.witness().record(),
            _ => {}
        }
    }

    fn step_volume_up(&self) {
        let next = self.engine.step_volume(true);
        self.unmute_on_audio_intent();
        self.show_volume(next.value());
    }

    fn toggle_mute_on_active(&self) {
        let Some(active) = self
            .registry
            .most_visible(self.page.viewport(), self.tuning.visible_min_height)
        else {
            trace!("mute hotkey with no visible video");
            return;
        };
        let mute = self.mute.clone();
        let engine = self.engine.clone();
        let notices = Arc::clone(&self.notices);
        tokio::spawn(async move {
            if let Ok(muted) = mute.toggle_mute(&active).await {
                if muted {
                    notices.show_notice("Muted", FEEDBACK_DURATION);
                } else {
                    let volume = engine.volume_to_apply().value();
                    notices.show_notice(
                        &format!("Volume {:.0}%", volume * 100.0),
                        FEEDBACK_DURATION,
                    );
                }
            }
        });
    }

    /// Raising the volume of a muted feed is an audible-playback gesture:
    /// it unmutes the active video and lifts the global mute lock.
    fn unmute_on_audio_intent(&self) {
        let Some(active) = self
            .registry
            .most_visible(self.page.viewport(), self.tuning.visible_min_height)
        else {
            return;
        };
        if !active.surface().muted() {
            return;
        }
        let mute = self.mute.clone();
        tokio::spawn(async move {
            let _ = mute.toggle_mute(&active).await;
        });
    }

    fn show_volume(&self, value: f64) {
        self.notices.show_notice(
            &format!("Volume {:.0}%", value * 100.0),
            FEEDBACK_DURATION,
        );
    }
}

#[cfg(test)]
mod tests {
    use reelsync_model::Rect;
    use tokio::task::yield_now;

    use super::*;
    use crate::guard::FailureGuard;
    use crate::mute::MatcherConfig;
    use crate::ports::{CompanionWindow, ScrollContainer};
    use crate::store::{MemoryStore, PreferenceStore};
    use crate::telemetry::Telemetry;
    use crate::testing::{FakeNotices, FakePage, FakePip, FakeVideo};

    struct Harness {
        page: FakePage,
        pip: FakePip,
        notices: FakeNotices,
        registry: Arc<VideoRegistry>,
        engine: Reconciler,
        keyboard: KeyboardControls,
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
        let pip = FakePip::new();
        let notices = FakeNotices::new();
        let mute = MuteSync::new(
            page.surface(),
            Arc::clone(&registry),
            engine.clone(),
            guard.clone(),
            Arc::clone(&telemetry),
            MatcherConfig::default(),
            EngineTuning::default(),
        );
        let pip_manager = PipManager::new(
            page.surface(),
            pip.platform(),
            Arc::clone(&registry),
            notices.sink(),
            guard.clone(),
            Arc::clone(&telemetry),
            EngineTuning::default(),
        );
        let navigator = Navigator::new(
            page.surface(),
            Arc::clone(&registry),
            engine.clone(),
            mute.clone(),
            pip_manager.clone(),
            guard,
            Arc::clone(&telemetry),
            EngineTuning::default(),
        );
        let keyboard = KeyboardControls::new(
            engine.clone(),
            mute,
            navigator,
            pip_manager,
            Arc::clone(&registry),
            page.surface(),
            notices.sink(),
            EngineTuning::default(),
        );
        Harness {
            page,
            pip,
            notices,
            registry,
            engine,
            keyboard,
        }
    }

    fn visible_video(h: &Harness) -> FakeVideo {
        let video = FakeVideo::new().with_bounds(Rect::new(0.0, 50.0, 400.0, 700.0));
        h.page.add_video(&video);
        h.registry.adopt(video.surface());
        video
    }

    #[tokio::test(start_paused = true)]
    async fn ctrl_arrow_down_steps_volume_with_feedback() {
        let h = harness();
        let video = visible_video(&h);

        assert!(h
            .keyboard
            .on_key_down(&KeyInput::plain(Key::ArrowDown).with_ctrl()));

        assert!((video.volume() - 0.9).abs() < 1e-9);
        assert!(h.notices.contains("Volume 90%"));
    }

    #[tokio::test(start_paused = true)]
    async fn bare_arrows_stay_with_the_host_page() {
        let h = harness();
        let video = visible_video(&h);

        for key in [Key::ArrowUp, Key::ArrowDown, Key::ArrowLeft, Key::ArrowRight] {
            assert!(!h.keyboard.on_key_down(&KeyInput::plain(key)));
        }

        assert!((video.volume() - 1.0).abs() < 1e-9);
        assert!(h.page.scrolls().is_empty());
        assert!(h.notices.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn bare_arrows_navigate_inside_the_companion_window() {
        let h = harness();
        h.page.set_containers(vec![ScrollContainer {
            id: 1,
            vertical_snap: true,
            scrollable: true,
            contains_video: true,
        }]);

        assert!(h
            .keyboard
            .on_key_down(&KeyInput::plain(Key::ArrowDown).in_companion()));
        yield_now().await;

        assert_eq!(h.page.scrolls(), vec![(Some(1), ScrollDirection::Next)]);
    }

    #[tokio::test(start_paused = true)]
    async fn digit_jumps_to_quick_volume() {
        let h = harness();
        let video = visible_video(&h);

        assert!(h.keyboard.on_key_down(&KeyInput::plain(Key::Digit(4))));

        assert!((video.volume() - 0.4).abs() < 1e-9);
        assert!(h.notices.contains("Volume 40%"));
    }

    #[tokio::test(start_paused = true)]
    async fn plus_and_minus_are_volume_synonyms() {
        let h = harness();
        let video = visible_video(&h);

        assert!(h.keyboard.on_key_down(&KeyInput::plain(Key::Minus)));
        assert!((video.volume() - 0.9).abs() < 1e-9);

        assert!(h.keyboard.on_key_down(&KeyInput::plain(Key::Plus)));
        assert!((video.volume() - 1.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn volume_up_on_a_muted_feed_unmutes_it() {
        let h = harness();
        let video = FakeVideo::new()
            .with_bounds(Rect::new(0.0, 50.0, 400.0, 700.0))
            .start_muted();
        h.page.add_video(&video);
        h.registry.adopt(video.surface());
        assert!(!h.engine.global_mute_unlocked());

        assert!(h
            .keyboard
            .on_key_down(&KeyInput::plain(Key::ArrowUp).with_ctrl()));
        yield_now().await;

        assert!(!video.is_muted());
        assert!(h.engine.global_mute_unlocked());
    }

    #[tokio::test(start_paused = true)]
    async fn editable_focus_suppresses_every_binding() {
        let h = harness();
        let video = visible_video(&h);

        let input = KeyInput::plain(Key::ArrowDown).in_editable();
        assert!(!h.keyboard.on_key_down(&input));

        assert!((video.volume() - 1.0).abs() < 1e-9);
        assert!(h.notices.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn browser_chords_and_unbound_keys_pass_through() {
        let h = harness();
        visible_video(&h);

        let mut alt_chord = KeyInput::plain(Key::ArrowUp);
        alt_chord.alt = true;
        assert!(!h.keyboard.on_key_down(&alt_chord));
        assert!(!h.keyboard.on_key_down(&KeyInput::plain(Key::M).with_ctrl()));
        assert!(!h.keyboard.on_key_down(&KeyInput::plain(Key::Other("x".into()))));
    }

    #[tokio::test(start_paused = true)]
    async fn ctrl_arrow_right_navigates_the_feed() {
        let h = harness();
        h.page.set_containers(vec![ScrollContainer {
            id: 1,
            vertical_snap: true,
            scrollable: true,
            contains_video: true,
        }]);

        assert!(h
            .keyboard
            .on_key_down(&KeyInput::plain(Key::ArrowRight).with_ctrl()));
        yield_now().await;

        assert_eq!(h.page.scrolls(), vec![(Some(1), ScrollDirection::Next)]);
    }

    #[tokio::test(start_paused = true)]
    async fn m_toggles_mute_on_the_active_video() {
        let h = harness();
        let video = visible_video(&h);

        assert!(h.keyboard.on_key_down(&KeyInput::plain(Key::M)));
        yield_now().await;

        assert!(video.is_muted());
        assert!(h.notices.contains("Muted"));
    }

    #[tokio::test(start_paused = true)]
    async fn p_opens_the_companion() {
        let h = harness();
        let video = visible_video(&h);

        assert!(h.keyboard.on_key_down(&KeyInput::plain(Key::P)));
        yield_now().await;

        assert!(h.pip.last_window().is_some());
        assert_eq!(
            h.page.relocated_to(video.surface().id()),
            h.pip.last_window().map(|w| w.id())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn value_keyups_leave_a_witness() {
        let h = harness();
        let window = EngineTuning::default().hotkey_witness_window;
        assert!(!h.engine.witness().seen_within(window));

        h.keyboard.on_key_up(&KeyInput::plain(Key::ArrowUp));
        assert!(h.engine.witness().seen_within(window));
    }

    #[tokio::test(start_paused = true)]
    async fn unbound_and_editable_keyups_leave_no_witness() {
        let h = harness();
        let window = EngineTuning::default().hotkey_witness_window;

        h.keyboard.on_key_up(&KeyInput::plain(Key::Other("x".into())));
        assert!(!h.engine.witness().seen_within(window));

        h.keyboard.on_key_up(&KeyInput::plain(Key::ArrowUp).in_editable());
        assert!(!h.engine.witness().seen_within(window));
    }
}
